use crate::{muted_error, weak_error};
use log::error;
use serde::Deserialize;
use std::fs::read_to_string;

/// Names of the introspection functions exported by the runtime of a debugee.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuntimeFunctions {
    pub is_instance: String,
    pub is_array: String,
    pub field_count: String,
    pub field_name: String,
    pub field_type: String,
    pub field_address: String,
    pub buffer: String,
    pub buffer_size: String,
    pub object_to_utf8: String,
    pub type_name: String,
}

/// Configuration of a runtime boundary: which functions are called and which symbols are used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuntimeConfig {
    pub textual_type_symbol: String,
    #[serde(default = "default_c_string_max_len")]
    pub c_string_max_len: usize,
    pub functions: RuntimeFunctions,
}

fn default_c_string_max_len() -> usize {
    0x1000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let default_config = include_str!("preset/runtime.toml");
        toml::de::from_str(default_config).expect("should de")
    }
}

impl RuntimeConfig {
    const DEFAULT_PATH: &'static str = ".config/objlens/runtime.toml";

    /// Load runtime configuration from file. Return [`None`] on errors.
    pub fn from_file(path: Option<&str>) -> Option<Self> {
        let data = match path {
            None => {
                let path = home::home_dir()?;
                let path = path.join(Self::DEFAULT_PATH);
                muted_error!(read_to_string(path))?
            }
            Some(path) => match read_to_string(path) {
                Ok(data) => data,
                Err(err) => {
                    error!("Error while load runtime config file: {err}");
                    return None;
                }
            },
        };

        Self::from_toml(&data)
    }

    /// Parse runtime configuration from a toml document. Return [`None`] on errors.
    pub fn from_toml(data: &str) -> Option<Self> {
        weak_error!(
            toml::de::from_str::<RuntimeConfig>(data),
            "runtime config parsing:"
        )
    }

    /// Load runtime configuration from file or use the default one.
    pub fn load(path: Option<&str>) -> Self {
        Self::from_file(path).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.textual_type_symbol, "kclass:kotlin.String");
        assert_eq!(cfg.c_string_max_len, 0x1000);
        assert_eq!(cfg.functions.field_count, "Konan_DebugGetFieldCount");
    }

    #[test]
    fn test_config_from_toml() {
        let data = r#"
textual_type_symbol = "class:String"

[functions]
is_instance = "rt_is_instance"
is_array = "rt_is_array"
field_count = "rt_field_count"
field_name = "rt_field_name"
field_type = "rt_field_type"
field_address = "rt_field_address"
buffer = "rt_buffer"
buffer_size = "rt_buffer_size"
object_to_utf8 = "rt_to_utf8"
type_name = "rt_type_name"
"#;
        let cfg = RuntimeConfig::from_toml(data).unwrap();
        assert_eq!(cfg.textual_type_symbol, "class:String");
        assert_eq!(cfg.c_string_max_len, 0x1000);
        assert_eq!(cfg.functions.buffer, "rt_buffer");

        assert!(RuntimeConfig::from_toml("textual_type_symbol = 1").is_none());
    }

    #[test]
    fn test_missing_file_fallback() {
        let cfg = RuntimeConfig::load(Some("/definitely/not/exists/runtime.toml"));
        assert_eq!(cfg, RuntimeConfig::default());
    }
}
