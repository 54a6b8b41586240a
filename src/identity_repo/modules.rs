// RAM module inventory parsers. Each strategy understands exactly one report format.

use crate::models::{MemoryModule, ModuleSourceTool};
use serde::Deserialize;
use serde_json::Value;

/// Turns one tool's report into memory modules. Empty output or no installed modules
/// yields an empty list.
pub trait MemoryModuleParser: Send + Sync {
    fn tool(&self) -> ModuleSourceTool;
    fn parse(&self, output: &str) -> Vec<MemoryModule>;
}

const PLACEHOLDERS: &[&str] = &[
    "not specified",
    "not provided",
    "unknown",
    "none",
    "[empty]",
    "no dimm",
    "not installed",
    "no module installed",
];

/// Trimmed value, or `None` for vendor placeholders.
fn meaningful(v: &str) -> Option<String> {
    let v = v.trim();
    if v.is_empty() || PLACEHOLDERS.contains(&v.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(v.to_string())
}

/// A size that denotes an empty slot.
fn is_absent_size(size: &str) -> bool {
    let s = size.trim();
    meaningful(s).is_none() || s.split_whitespace().next().is_some_and(|n| n == "0")
}

fn fields(block: &str) -> Vec<(&str, &str)> {
    block
        .lines()
        .filter_map(|line| {
            let (k, v) = line.split_once(':')?;
            Some((k.trim(), v.trim()))
        })
        .collect()
}

fn field<'a>(fields: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    fields.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// `dmidecode -t 17` (SMBIOS Memory Device records).
pub struct DmidecodeParser;

impl MemoryModuleParser for DmidecodeParser {
    fn tool(&self) -> ModuleSourceTool {
        ModuleSourceTool::Dmidecode
    }

    fn parse(&self, output: &str) -> Vec<MemoryModule> {
        let mut modules = Vec::new();
        for block in output.split("\nHandle ") {
            if !block.lines().any(|l| l.trim() == "Memory Device") {
                continue;
            }
            let f = fields(block);
            let Some(size) = field(&f, "Size").filter(|s| !is_absent_size(s)) else {
                continue;
            };
            let slot = field(&f, "Locator")
                .and_then(meaningful)
                .or_else(|| field(&f, "Bank Locator").and_then(meaningful))
                .unwrap_or_else(|| format!("DIMM {}", modules.len()));
            let speed = field(&f, "Configured Memory Speed")
                .or_else(|| field(&f, "Configured Clock Speed"))
                .and_then(meaningful)
                .or_else(|| field(&f, "Speed").and_then(meaningful));
            modules.push(MemoryModule {
                slot,
                size_label: size.to_string(),
                speed_label: speed,
                manufacturer: field(&f, "Manufacturer").and_then(meaningful),
                part_number: field(&f, "Part Number").and_then(meaningful),
                serial_number: field(&f, "Serial Number").and_then(meaningful),
            });
        }
        modules
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LshwNode {
    id: String,
    description: Option<String>,
    product: Option<String>,
    vendor: Option<String>,
    serial: Option<String>,
    slot: Option<String>,
    size: Option<Value>,
    clock: Option<Value>,
    children: Vec<LshwNode>,
}

impl LshwNode {
    fn is_empty_bank(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| d.to_ascii_lowercase().contains("[empty]"))
    }

    fn size_label(&self) -> Option<String> {
        match self.size.as_ref()? {
            Value::Number(n) => n.as_u64().filter(|b| *b > 0).map(|b| b.to_string()),
            Value::String(s) => meaningful(s).filter(|s| !is_absent_size(s)),
            _ => None,
        }
    }

    fn speed_label(&self) -> Option<String> {
        let hz = self.clock.as_ref()?.as_u64().filter(|hz| *hz > 0)?;
        Some(format!("{} MHz", hz / 1_000_000))
    }
}

fn collect_banks<'a>(node: &'a LshwNode, out: &mut Vec<&'a LshwNode>) {
    if node.id.starts_with("bank") {
        out.push(node);
    }
    for child in &node.children {
        collect_banks(child, out);
    }
}

/// `lshw -json -class memory`. Newer releases print an array, older ones a bare
/// object or a comma-separated object sequence.
pub struct LshwJsonParser;

impl LshwJsonParser {
    fn roots(output: &str) -> Vec<LshwNode> {
        let trimmed = output.trim().trim_end_matches(',');
        let value = serde_json::from_str::<Value>(trimmed)
            .or_else(|_| serde_json::from_str::<Value>(&format!("[{}]", trimmed)));
        match value {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            Ok(v @ Value::Object(_)) => serde_json::from_value::<LshwNode>(v).into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl MemoryModuleParser for LshwJsonParser {
    fn tool(&self) -> ModuleSourceTool {
        ModuleSourceTool::LshwJson
    }

    fn parse(&self, output: &str) -> Vec<MemoryModule> {
        let roots = Self::roots(output);
        let mut banks = Vec::new();
        for root in &roots {
            collect_banks(root, &mut banks);
        }
        banks
            .into_iter()
            .filter(|b| !b.is_empty_bank())
            .filter_map(|b| {
                let size_label = b.size_label()?;
                Some(MemoryModule {
                    slot: b
                        .slot
                        .as_deref()
                        .and_then(meaningful)
                        .unwrap_or_else(|| b.id.clone()),
                    size_label,
                    speed_label: b.speed_label(),
                    manufacturer: b.vendor.as_deref().and_then(meaningful),
                    part_number: b.product.as_deref().and_then(meaningful),
                    serial_number: b.serial.as_deref().and_then(meaningful),
                })
            })
            .collect()
    }
}

/// `lshw -class memory` plain text: `*-bank:N` nodes with slot/size/vendor/serial lines.
/// This format carries no usable speed.
pub struct LshwTextParser;

impl MemoryModuleParser for LshwTextParser {
    fn tool(&self) -> ModuleSourceTool {
        ModuleSourceTool::LshwText
    }

    fn parse(&self, output: &str) -> Vec<MemoryModule> {
        let mut banks: Vec<(String, Vec<&str>)> = Vec::new();
        let mut in_bank = false;
        for line in output.lines() {
            let t = line.trim();
            if let Some(header) = t.strip_prefix("*-") {
                in_bank = header.starts_with("bank");
                if in_bank {
                    banks.push((header.to_string(), Vec::new()));
                }
            } else if in_bank && let Some((_, lines)) = banks.last_mut() {
                lines.push(t);
            }
        }

        banks
            .into_iter()
            .filter_map(|(header, lines)| {
                let joined = lines.join("\n");
                let f = fields(&joined);
                let get = |key: &str| field(&f, key).and_then(meaningful);
                if get("description").is_some_and(|d| d.to_ascii_lowercase().contains("[empty]")) {
                    return None;
                }
                let size = get("size").filter(|s| !is_absent_size(s))?;
                Some(MemoryModule {
                    slot: get("slot").unwrap_or(header),
                    size_label: size,
                    speed_label: None,
                    manufacturer: get("vendor"),
                    part_number: get("product"),
                    serial_number: get("serial"),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DMIDECODE: &str = "# dmidecode 3.4
Getting SMBIOS data from sysfs.
SMBIOS 3.2.0 present.

Handle 0x0040, DMI type 17, 84 bytes
Memory Device
\tArray Handle: 0x003F
\tSize: 8 GB
\tLocator: DIMM_A1
\tBank Locator: BANK 0
\tType: DDR4
\tSpeed: 2667 MT/s
\tManufacturer: Samsung
\tSerial Number: 12345678
\tPart Number: M378A1K43CB2-CTD   
\tConfigured Memory Speed: 2400 MT/s

Handle 0x0041, DMI type 17, 84 bytes
Memory Device
\tArray Handle: 0x003F
\tSize: No Module Installed
\tLocator: DIMM_A2
\tBank Locator: BANK 1
\tSpeed: Unknown
\tManufacturer: Not Specified

Handle 0x0042, DMI type 17, 84 bytes
Memory Device
\tSize: 16384 MB
\tLocator: Not Specified
\tBank Locator: BANK 2
\tSpeed: 3200 MT/s
\tConfigured Memory Speed: Unknown
\tManufacturer: Unknown
";

    #[test]
    fn dmidecode_extracts_installed_modules() {
        let modules = DmidecodeParser.parse(DMIDECODE);
        assert_eq!(modules.len(), 2);
        assert_eq!(
            modules[0],
            MemoryModule {
                slot: "DIMM_A1".into(),
                size_label: "8 GB".into(),
                speed_label: Some("2400 MT/s".into()),
                manufacturer: Some("Samsung".into()),
                part_number: Some("M378A1K43CB2-CTD".into()),
                serial_number: Some("12345678".into()),
            }
        );
        assert_eq!(modules[1].slot, "BANK 2");
        assert_eq!(modules[1].speed_label.as_deref(), Some("3200 MT/s"));
        assert_eq!(modules[1].manufacturer, None);
    }

    #[test]
    fn dmidecode_without_devices_is_empty() {
        assert!(DmidecodeParser.parse("").is_empty());
        assert!(
            DmidecodeParser
                .parse("# dmidecode 3.4\n/sys/firmware/dmi/tables/smbios_entry_point: Permission denied\n")
                .is_empty()
        );
    }

    const LSHW_JSON: &str = r#"[
      {"id":"firmware","class":"memory","description":"BIOS","size":65536},
      {"id":"memory","class":"memory","description":"System Memory","size":17179869184,
       "children":[
         {"id":"bank:0","class":"memory","description":"DIMM DDR4 Synchronous 2667 MHz (0.4 ns)",
          "product":"M378A1K43CB2-CTD","vendor":"Samsung","serial":"12345678","slot":"DIMM_A1",
          "units":"bytes","size":8589934592,"clock":2667000000},
         {"id":"bank:1","class":"memory","description":"[empty]","slot":"DIMM_A2"}
       ]}
    ]"#;

    #[test]
    fn lshw_json_walks_bank_nodes() {
        let modules = LshwJsonParser.parse(LSHW_JSON);
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].slot, "DIMM_A1");
        assert_eq!(modules[0].size_label, "8589934592");
        assert_eq!(modules[0].speed_label.as_deref(), Some("2667 MHz"));
        assert_eq!(modules[0].manufacturer.as_deref(), Some("Samsung"));
    }

    #[test]
    fn lshw_json_accepts_bare_object_sequence() {
        let legacy = r#"{"id":"memory","class":"memory","children":[
            {"id":"bank","class":"memory","slot":"SODIMM","size":4294967296}]},"#;
        let modules = LshwJsonParser.parse(legacy);
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].slot, "SODIMM");
        assert_eq!(modules[0].speed_label, None);
    }

    const LSHW_TEXT: &str = "  *-firmware
       description: BIOS
       size: 64KiB
  *-memory
       description: System Memory
       physical id: 1000
       size: 16GiB
     *-bank:0
          description: DIMM DDR4 Synchronous 2667 MHz (0.4 ns)
          product: M378A1K43CB2-CTD
          vendor: Samsung
          physical id: 0
          serial: 12345678
          slot: DIMM_A1
          size: 8GiB
          width: 64 bits
          clock: 2667MHz (0.4ns)
     *-bank:1
          description: [empty]
          physical id: 1
          slot: DIMM_A2
";

    #[test]
    fn lshw_text_uses_its_own_schema() {
        let modules = LshwTextParser.parse(LSHW_TEXT);
        assert_eq!(
            modules,
            vec![MemoryModule {
                slot: "DIMM_A1".into(),
                size_label: "8GiB".into(),
                speed_label: None,
                manufacturer: Some("Samsung".into()),
                part_number: Some("M378A1K43CB2-CTD".into()),
                serial_number: Some("12345678".into()),
            }]
        );
    }

    #[test]
    fn formats_do_not_cross_parse() {
        assert!(DmidecodeParser.parse(LSHW_TEXT).is_empty());
        assert!(LshwJsonParser.parse(LSHW_TEXT).is_empty());
        assert!(LshwTextParser.parse(DMIDECODE).is_empty());
    }
}
