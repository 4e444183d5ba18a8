//! INI file configuration adapter.

use crate::domain::error::ReplayError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| ReplayError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ReplayError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ReplayError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
path = data/eur_usd_m15.csv
start = 2024-11-12 07:00

[playback]
step_size = 2
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("data/eur_usd_m15.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "start"),
            Some("2024-11-12 07:00".to_string())
        );
        assert_eq!(adapter.get_int("playback", "step_size", 1), 2);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[data]\npath = a.csv\n").unwrap();
        assert_eq!(adapter.get_string("data", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[indicators]\nrsi_period = abc\n").unwrap();
        assert_eq!(adapter.get_int("indicators", "rsi_period", 14), 14);
        assert_eq!(adapter.get_int("indicators", "missing", 42), 42);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[indicators]\npeak_prominence = 0.25\n").unwrap();
        assert_eq!(adapter.get_double("indicators", "peak_prominence", 0.1), 0.25);
        assert_eq!(adapter.get_double("indicators", "missing", 0.1), 0.1);
    }

    #[test]
    fn get_usize_rejects_negative() {
        let adapter =
            FileConfigAdapter::from_string("[trading]\nledger_tail = -3\nmax_signal_age = 7\n")
                .unwrap();
        assert_eq!(adapter.get_usize("trading", "ledger_tail", 10), 10);
        assert_eq!(adapter.get_usize("trading", "max_signal_age", 100), 7);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[trading]\na = true\nb = yes\nc = on\nd = false\ne = 0\nf = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("trading", "a", false));
        assert!(adapter.get_bool("trading", "b", false));
        assert!(adapter.get_bool("trading", "c", false));
        assert!(!adapter.get_bool("trading", "d", true));
        assert!(!adapter.get_bool("trading", "e", true));
        assert!(adapter.get_bool("trading", "f", true));
        assert!(!adapter.get_bool("trading", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[trading]\nauto_trade = false\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert!(!adapter.get_bool("trading", "auto_trade", true));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(ReplayError::ConfigParse { .. })));
    }
}
