// Startup module - displays banner and service status
//
// Shows version, the config file in use, and which external services are
// wired up before the server starts accepting requests.

use crate::config::{Config, StorageBackend, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Service status for display
pub struct ModuleStatus {
    pub name: &'static str,
    pub enabled: bool,
    pub description: String,
}

/// Print the startup banner and service status
pub fn print_startup(config: &Config) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}CourseMind{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Study guides, quizzes and chat for course material{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    println!("  {DIM}Loading modules...{RESET}");
    for module in &get_module_status(config) {
        print_module_status(module);
    }
    println!();

    println!(
        "  {MAGENTA}▸{RESET} API listening on {BOLD}http://{}{RESET}",
        config.bind_addr
    );
    if !config.model.is_configured() {
        println!(
            "  {YELLOW}▸{RESET} {YELLOW}GEMINI_API_KEY not set{RESET} {DIM}(analysis requests will fail){RESET}"
        );
    }
    println!();
}

/// Status of every service based on config
fn get_module_status(config: &Config) -> Vec<ModuleStatus> {
    let storage_description = match config.storage.backend {
        StorageBackend::Sqlite => format!("SQLite ({})", config.storage.db_path.display()),
        StorageBackend::Firestore => format!(
            "Firestore ({})",
            config.storage.firestore_project.as_deref().unwrap_or("?")
        ),
        StorageBackend::None => "Saving disabled".to_string(),
    };

    vec![
        ModuleStatus {
            name: "server",
            enabled: true,
            description: "HTTP API".to_string(),
        },
        ModuleStatus {
            name: "model",
            enabled: config.model.is_configured(),
            description: format!(
                "{} / {}",
                config.model.fast_model, config.model.deep_model
            ),
        },
        ModuleStatus {
            name: "storage",
            enabled: config.storage.backend != StorageBackend::None,
            description: storage_description,
        },
        ModuleStatus {
            name: "auth",
            enabled: config.auth.is_active(),
            description: "Firebase sign-in".to_string(),
        },
        ModuleStatus {
            name: "drive",
            enabled: true,
            description: "Google Drive picker".to_string(),
        },
        ModuleStatus {
            name: "file-log",
            enabled: config.logging.file_enabled,
            description: format!("JSON logs in {}", config.logging.file_dir.display()),
        },
    ]
}

fn print_module_status(module: &ModuleStatus) {
    use colors::*;

    let (icon, style) = if module.enabled {
        (format!("{GREEN}✓{RESET}"), "")
    } else {
        (format!("{DIM}○{RESET}"), DIM)
    };

    println!(
        "    {icon} {style}{:<12}{RESET} {DIM}{}{RESET}",
        module.name, module.description
    );
}

/// Write the same boot sequence to the log, for file-only deployments
pub fn log_startup(config: &Config) {
    tracing::info!("CourseMind v{}", VERSION);

    for module in &get_module_status(config) {
        let icon = if module.enabled { "✓" } else { "○" };
        tracing::info!("  {} {} - {}", icon, module.name, module.description);
    }

    tracing::info!("▸ Listening on {}", config.bind_addr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_reports_core_services() {
        let modules = get_module_status(&Config::default());
        let names: Vec<_> = modules.iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            ["server", "model", "storage", "auth", "drive", "file-log"]
        );
        assert!(modules[0].enabled);
    }

    #[test]
    fn disabled_storage_is_marked() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::None;
        let modules = get_module_status(&config);
        let storage = modules.iter().find(|m| m.name == "storage").unwrap();
        assert!(!storage.enabled);
        assert_eq!(storage.description, "Saving disabled");
    }
}
