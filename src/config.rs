//! Minimal INI-style configuration loader for the keys named in §6. This is
//! deliberately small and hand-rolled: §1 names "configuration file parsing"
//! as a Non-goal feature, so the loader only understands the exact sections
//! and keys §6 enumerates, grounded in the original `config/config.c`'s
//! default-then-override-then-validate structure (none of the five example
//! repos pulls in a general-purpose INI crate, so this stays consistent
//! with the corpus rather than reaching for one).

use std::collections::HashMap;
use std::path::Path;

use crate::defaults::{DEFAULT_STATUS_PUBLISHER_PORT, LOGICAL_ADDRESS_RSM_BASE, MAX_INSTANCES};
use crate::error::CommsError;

type Section = HashMap<String, String>;

/// A parsed INI document: lowercased section name -> lowercased key -> raw
/// (case-preserved) value.
struct IniDocument {
    sections: HashMap<String, Section>,
}

impl IniDocument {
    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_ascii_lowercase())
            .and_then(|s| s.get(&key.to_ascii_lowercase()))
            .map(String::as_str)
    }
}

fn parse_ini(text: &str) -> Result<IniDocument, CommsError> {
    let mut sections: HashMap<String, Section> = HashMap::new();
    let mut current = String::new();
    sections.entry(current.clone()).or_default();

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(CommsError::Config(format!(
                    "malformed section header on line {}",
                    line_no + 1
                )));
            }
            current = line[1..line.len() - 1].trim().to_ascii_lowercase();
            sections.entry(current.clone()).or_default();
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(CommsError::Config(format!(
                "expected 'key = value' on line {}",
                line_no + 1
            )));
        };
        sections
            .entry(current.clone())
            .or_default()
            .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(IniDocument { sections })
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config file not found or unreadable, using defaults");
            None
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_int(value: &str, default: i64) -> i64 {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).unwrap_or(default)
    } else {
        value.parse().unwrap_or(default)
    }
}

/// Per-instance settings read from `[svm_settings_<N>]` and the port from
/// `[ethernet_svm<N>]`, per §6.
#[derive(Debug, Clone)]
pub struct RsmInstanceSettings {
    pub id: usize,
    pub port: u16,
    pub lak: u8,
    pub simulate_control_failure: bool,
    pub disconnect_after_messages: i32,
    pub simulate_response_timeout: bool,
    pub send_warning_on_confirm: bool,
    pub warning_tks: u8,
}

#[derive(Debug, Clone)]
pub struct RsmConfig {
    pub interface_type: String,
    pub instances: Vec<RsmInstanceSettings>,
}

/// Per-target settings from the CCU's point of view: the port it must dial
/// and the LAK it expects that RSM to report back.
#[derive(Debug, Clone)]
pub struct CcuTargetConfig {
    pub id: usize,
    pub port: u16,
    pub assigned_lak: u8,
}

#[derive(Debug, Clone)]
pub struct CcuConfig {
    pub interface_type: String,
    pub target_ip: String,
    pub targets: Vec<CcuTargetConfig>,
    pub status_publisher_port: u16,
}

pub fn load_rsm_config(path: &Path) -> Result<RsmConfig, CommsError> {
    let doc = match read_optional(path) {
        Some(text) => parse_ini(&text)?,
        None => parse_ini("")?,
    };

    let interface_type = doc
        .get("communication", "interface_type")
        .unwrap_or("ethernet")
        .to_string();

    let mut instances = Vec::new();
    for id in 0..MAX_INSTANCES {
        let eth_section = format!("ethernet_svm{id}");
        let settings_section = format!("svm_settings_{id}");

        let default_port = 8080 + id as u16;
        let port = doc
            .get(&eth_section, "port")
            .and_then(|v| v.parse::<u16>().ok())
            .filter(|p| *p != 0)
            .unwrap_or(default_port);

        let default_lak = LOGICAL_ADDRESS_RSM_BASE + id as u8;
        let lak = doc
            .get(&settings_section, "lak")
            .map(|v| parse_int(v, default_lak as i64) as u8)
            .unwrap_or(default_lak);

        let simulate_control_failure = doc
            .get(&settings_section, "simulate_control_failure")
            .map(parse_bool)
            .unwrap_or(false);
        let disconnect_after_messages = doc
            .get(&settings_section, "disconnect_after_messages")
            .map(|v| parse_int(v, -1) as i32)
            .unwrap_or(-1);
        let simulate_response_timeout = doc
            .get(&settings_section, "simulate_response_timeout")
            .map(parse_bool)
            .unwrap_or(false);
        let send_warning_on_confirm = doc
            .get(&settings_section, "send_warning_on_confirm")
            .map(parse_bool)
            .unwrap_or(false);
        let warning_tks = doc
            .get(&settings_section, "warning_tks")
            .map(|v| parse_int(v, 0) as u8)
            .unwrap_or(0);

        // An instance is "configured" if either of its sections is present
        // in the file, or (for a config-free run) instance 0 always is.
        let present = doc.sections.contains_key(&eth_section)
            || doc.sections.contains_key(&settings_section)
            || id == 0;
        if present {
            instances.push(RsmInstanceSettings {
                id,
                port,
                lak,
                simulate_control_failure,
                disconnect_after_messages,
                simulate_response_timeout,
                send_warning_on_confirm,
                warning_tks,
            });
        }
    }

    if instances.is_empty() {
        return Err(CommsError::Config(
            "no RSM instance configurations found".to_string(),
        ));
    }

    Ok(RsmConfig {
        interface_type,
        instances,
    })
}

pub fn load_ccu_config(path: &Path) -> Result<CcuConfig, CommsError> {
    let doc = match read_optional(path) {
        Some(text) => parse_ini(&text)?,
        None => parse_ini("")?,
    };

    let interface_type = doc
        .get("communication", "interface_type")
        .unwrap_or("ethernet")
        .to_string();
    let target_ip = doc
        .get("ethernet_uvm_target", "target_ip")
        .unwrap_or("127.0.0.1")
        .to_string();
    let status_publisher_port = doc
        .get("status_publisher", "port")
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_STATUS_PUBLISHER_PORT);

    let mut targets = Vec::new();
    for id in 0..MAX_INSTANCES {
        let eth_section = format!("ethernet_svm{id}");
        let settings_section = format!("svm_settings_{id}");
        let present = doc.sections.contains_key(&eth_section)
            || doc.sections.contains_key(&settings_section)
            || id == 0;
        if !present {
            continue;
        }
        let default_port = 8080 + id as u16;
        let port = doc
            .get(&eth_section, "port")
            .and_then(|v| v.parse::<u16>().ok())
            .filter(|p| *p != 0)
            .unwrap_or(default_port);
        let default_lak = LOGICAL_ADDRESS_RSM_BASE + id as u8;
        let assigned_lak = doc
            .get(&settings_section, "lak")
            .map(|v| parse_int(v, default_lak as i64) as u8)
            .unwrap_or(default_lak);
        targets.push(CcuTargetConfig {
            id,
            port,
            assigned_lak,
        });
    }

    if targets.is_empty() {
        return Err(CommsError::Config(
            "no RSM target configurations found".to_string(),
        ));
    }

    Ok(CcuConfig {
        interface_type,
        target_ip,
        targets,
        status_publisher_port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_uses_single_default_instance() {
        let cfg = load_rsm_config(Path::new("/nonexistent/path/config.ini")).unwrap();
        assert_eq!(cfg.instances.len(), 1);
        assert_eq!(cfg.instances[0].lak, LOGICAL_ADDRESS_RSM_BASE);
        assert_eq!(cfg.instances[0].disconnect_after_messages, -1);
    }

    #[test]
    fn parses_two_instances_with_fault_injection() {
        let text = r#"
[communication]
interface_type = ethernet

[ethernet_svm0]
port = 9001

[svm_settings_0]
lak = 0x08
simulate_control_failure = true

[ethernet_svm1]
port = 9002

[svm_settings_1]
lak = 9
disconnect_after_messages = 3
send_warning_on_confirm = yes
warning_tks = 5
"#;
        let file = write_temp(text);
        let cfg = load_rsm_config(file.path()).unwrap();
        assert_eq!(cfg.instances.len(), 2);
        assert_eq!(cfg.instances[0].port, 9001);
        assert_eq!(cfg.instances[0].lak, 0x08);
        assert!(cfg.instances[0].simulate_control_failure);
        assert_eq!(cfg.instances[1].port, 9002);
        assert_eq!(cfg.instances[1].lak, 9);
        assert_eq!(cfg.instances[1].disconnect_after_messages, 3);
        assert!(cfg.instances[1].send_warning_on_confirm);
        assert_eq!(cfg.instances[1].warning_tks, 5);
    }

    #[test]
    fn case_insensitive_sections_and_keys() {
        let text = "[SVM_SETTINGS_0]\nLAK = 0x0A\n";
        let file = write_temp(text);
        let cfg = load_rsm_config(file.path()).unwrap();
        assert_eq!(cfg.instances[0].lak, 0x0A);
    }

    #[test]
    fn malformed_line_is_config_error() {
        let file = write_temp("not a valid line\n");
        let err = load_rsm_config(file.path()).unwrap_err();
        assert!(matches!(err, CommsError::Config(_)));
    }

    #[test]
    fn ccu_config_reads_target_ip_and_ports() {
        let text = r#"
[ethernet_uvm_target]
target_ip = 10.0.0.5

[ethernet_svm0]
port = 9001
[svm_settings_0]
lak = 8
"#;
        let file = write_temp(text);
        let cfg = load_ccu_config(file.path()).unwrap();
        assert_eq!(cfg.target_ip, "10.0.0.5");
        assert_eq!(cfg.targets[0].port, 9001);
        assert_eq!(cfg.targets[0].assigned_lak, 8);
    }
}
