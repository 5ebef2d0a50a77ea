//! Host detection, done once at startup

use std::path::Path;

const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    RaspberryPi,
    MacOs,
    Other,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            return Platform::MacOs;
        }
        Self::from_model_file(Path::new(DEVICE_TREE_MODEL))
    }

    fn from_model_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(model) => Self::from_model(&model),
            Err(_) => Platform::Other,
        }
    }

    fn from_model(model: &str) -> Self {
        if model.to_lowercase().contains("raspberry pi") {
            Platform::RaspberryPi
        } else {
            Platform::Other
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::RaspberryPi => write!(f, "raspberry-pi"),
            Platform::MacOs => write!(f, "macos"),
            Platform::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_model_string() {
        assert_eq!(
            Platform::from_model("Raspberry Pi 4 Model B Rev 1.4\0"),
            Platform::RaspberryPi
        );
        assert_eq!(Platform::from_model("Generic x86"), Platform::Other);
    }

    #[test]
    fn test_model_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Raspberry Pi 5 Model B").unwrap();
        assert_eq!(Platform::from_model_file(file.path()), Platform::RaspberryPi);
        assert_eq!(
            Platform::from_model_file(Path::new("/nonexistent/model")),
            Platform::Other
        );
    }
}
