//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize config to TOML string
    pub fn to_toml(&self) -> String {
        let firestore_project = match &self.storage.firestore_project {
            Some(project) => format!("firestore_project = \"{}\"", project),
            None => "# firestore_project = \"my-project\"".to_string(),
        };

        format!(
            r#"# coursemind configuration
#
# Secrets are read from the environment only:
#   GEMINI_API_KEY (or API_KEY)   model access
#   FIREBASE_API_KEY              sign-in and Firestore saves

# HTTP bind address
bind_addr = "{bind}"

# Language for generated study guides, quizzes and answers
default_language = "{language}"

[model]
api_base = "{api_base}"
# Chapter detection, extra questions and chat
fast_model = "{fast_model}"
# Full study-guide analysis
deep_model = "{deep_model}"
timeout_secs = {timeout}

# Maximum characters of source text sent per request
[limits]
detect_chars = {detect}
analyze_chars = {analyze}
quiz_chars = {quiz}
chat_chars = {chat}

[sessions]
idle_ttl_secs = {ttl}
sweep_interval_secs = {sweep}
max_sessions = {max_sessions}

# Saved analyses: sqlite, firestore, none
[storage]
backend = "{backend}"
db_path = "{db_path}"
{firestore_project}
firestore_api_base = "{firestore_base}"

[auth]
enabled = {auth_enabled}
identity_api_base = "{identity_base}"

[drive]
api_base = "{drive_base}"

[logging]
# trace, debug, info, warn, error (RUST_LOG overrides)
level = "{level}"
file_enabled = {file_enabled}
file_dir = "{file_dir}"
# hourly, daily, never
file_rotation = "{rotation}"
file_prefix = "{prefix}"
"#,
            bind = self.bind_addr,
            language = self.default_language,
            api_base = self.model.api_base,
            fast_model = self.model.fast_model,
            deep_model = self.model.deep_model,
            timeout = self.model.timeout_secs,
            detect = self.limits.detect_chars,
            analyze = self.limits.analyze_chars,
            quiz = self.limits.quiz_chars,
            chat = self.limits.chat_chars,
            ttl = self.sessions.idle_ttl_secs,
            sweep = self.sessions.sweep_interval_secs,
            max_sessions = self.sessions.max_sessions,
            backend = self.storage.backend.as_str(),
            db_path = self.storage.db_path.display(),
            firestore_project = firestore_project,
            firestore_base = self.storage.firestore_api_base,
            auth_enabled = self.auth.enabled,
            identity_base = self.auth.identity_api_base,
            drive_base = self.drive.api_base,
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display(),
            rotation = self.logging.file_rotation.as_str(),
            prefix = self.logging.file_prefix,
        )
    }
}
