// Text helpers for host identity: os-release, cpuinfo, lspci.

/// PRETTY_NAME from os-release content, falling back to NAME.
pub(super) fn parse_os_name(content: &str) -> Option<String> {
    let value = |key: &str| {
        content.lines().find_map(|line| {
            let v = line.strip_prefix(key)?.trim().trim_matches('"').trim();
            (!v.is_empty()).then(|| v.to_string())
        })
    };
    value("PRETTY_NAME=").or_else(|| value("NAME="))
}

/// First "model name" from cpuinfo; ARM boards report "Model" or "Hardware" instead.
pub(super) fn parse_cpu_model(content: &str) -> Option<String> {
    let field = |key: &str| {
        content.lines().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            if k.trim() != key {
                return None;
            }
            let v = v.trim();
            (!v.is_empty() && v != "cpu0").then(|| v.to_string())
        })
    };
    field("model name")
        .or_else(|| field("Model"))
        .or_else(|| field("Hardware"))
}

const DISPLAY_CLASSES: &[&str] = &[
    "VGA compatible controller",
    "3D controller",
    "Display controller",
];

/// Description of the first display-class device in `lspci` output.
pub(super) fn parse_gpu(lspci: &str) -> Option<String> {
    lspci.lines().find_map(|line| {
        let class = DISPLAY_CLASSES.iter().find(|c| line.contains(*c))?;
        let (_, rest) = line.split_once(class)?;
        let desc = rest.trim_start_matches(':').trim();
        (!desc.is_empty()).then(|| desc.to_string())
    })
}
