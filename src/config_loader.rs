use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs;
use std::path::Path;

/// Load, parse and validate configuration from a YAML answers file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let content = fs::read_to_string(config_path)
        .wrap_err_with(|| format!("Failed to read configuration file '{}'", config_path.display()))?;

    // An empty answers file is valid and yields the defaults
    let config: Config = if content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse configuration file '{}'", config_path.display()))?
    };

    config.validate()?;

    Ok(config)
}

/// CLI arguments that override answers-file settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output: Option<std::path::PathBuf>,
}

/// Apply CLI overrides to a loaded configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(output) = &overrides.output {
        info!("Output path overridden on the command line: {:?}", output);
        config.output.path = output.clone();
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
country_codes: "/usr/share/rirdb/iso-alpha2.txt"
cache_dir: "/var/cache/rirdb"
registries:
  - apnic
  - ripencc
ignore_package_errors: true
batch_size: 1000
output:
  format: json_lines
  path: "ranges.jsonl"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.country_codes, Some(PathBuf::from("/usr/share/rirdb/iso-alpha2.txt")));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/rirdb"));
        assert_eq!(config.registries, vec!["apnic", "ripencc"]);
        assert!(config.ignore_package_errors);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.output.format, OutputFormat::JsonLines);
        assert_eq!(config.output.path, PathBuf::from("ranges.jsonl"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "batch_size: 0\n").unwrap();
        assert!(load_config(temp_file.path()).is_err());

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "registries: [apnic, iana]\n").unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config(Path::new("/nonexistent/rirdb.yaml")).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        apply_overrides(&mut config, &CliOverrides::default()).unwrap();
        assert_eq!(config.output.path, PathBuf::from("iptable.sql"));

        let overrides = CliOverrides {
            output: Some(PathBuf::from("out.sql")),
        };
        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.output.path, PathBuf::from("out.sql"));
    }
}
