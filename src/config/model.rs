// src/config/model.rs

use std::collections::BTreeMap;

use lightningcss::targets::Browsers;
use serde::Deserialize;

/// Top-level configuration as read from `Sitegear.toml`.
///
/// ```toml
/// [project]
/// source = "src"
/// dest = "docs"
///
/// [task.styles]
/// action = "styles"
/// after = ["markup"]
/// watch = ["css/**/*.css"]
/// entry = ["css/main.css"]
/// dest = ["css"]
/// ```
///
/// All sections are optional and have defaults except `[task.<name>]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Source/destination roots from `[project]`.
    #[serde(default)]
    pub project: ProjectSection,

    /// Dev server listen address from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// Defaults for `watch` / `exclude` from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[project]` section: filesystem layout roots.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Source root all patterns are evaluated beneath.
    #[serde(default = "default_source")]
    pub source: String,

    /// Destination root all pipelines write beneath.
    #[serde(default = "default_dest")]
    pub dest: String,

    /// Root for tilde-prefixed style imports, if the project uses them.
    #[serde(default)]
    pub packages: Option<String>,
}

fn default_source() -> String {
    "src".to_string()
}

fn default_dest() -> String {
    "dist".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            dest: default_dest(),
            packages: None,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[default]` section: watch/exclude patterns applied to tasks that do not
/// override them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    #[serde(default)]
    pub watch: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// What the task runs; see [`ActionConfig`].
    #[serde(flatten)]
    pub action: ActionConfig,

    /// Ordering: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Declared concurrency: tasks this one runs alongside. Introduces no
    /// ordering edges; validated for consistency.
    #[serde(default)]
    pub parallel_with: Vec<String>,

    /// Optional task-local watch patterns. If `None`, `default.watch`
    /// applies.
    #[serde(default)]
    pub watch: Option<Vec<String>>,

    /// Optional task-local exclude patterns. If `None`, `default.exclude`
    /// applies.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// If true, `default.watch` is appended to `task.watch` instead of
    /// being replaced by it.
    #[serde(default)]
    pub append_default_watch: bool,

    /// If true, `default.exclude` is appended to `task.exclude`.
    #[serde(default)]
    pub append_default_exclude: bool,

    /// Failure of this task does not skip dependents or fail the graph.
    /// Unset, it defaults to `true` for lint tasks and `false` otherwise.
    #[serde(default)]
    pub soft_fail: Option<bool>,
}

impl TaskConfig {
    pub fn effective_soft_fail(&self) -> bool {
        self.soft_fail
            .unwrap_or(matches!(self.action, ActionConfig::Stylelint { .. }))
    }
}

/// The runnable unit of a task, selected by the `action` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Remove the destination root.
    Clean,

    /// Lint stylesheet sources and write a report.
    Stylelint {
        source: Vec<String>,
        #[serde(default = "default_report_dir")]
        report_dir: String,
    },

    /// Compile page templates against partials, helpers and data records.
    Template {
        pages: Vec<String>,
        partials: String,
        data: String,
        #[serde(default = "default_root_dest")]
        dest: Vec<String>,
        #[serde(default)]
        required: bool,
    },

    /// Compile stylesheet entry files.
    Styles {
        entry: Vec<String>,
        #[serde(default)]
        purge_content: Vec<String>,
        #[serde(default)]
        targets: TargetsSection,
        dest: Vec<String>,
        #[serde(default = "default_compat")]
        compat: String,
        #[serde(default)]
        required: bool,
    },

    /// Downlevel and bundle scripts into one artifact.
    Scripts {
        source: Vec<String>,
        #[serde(default = "default_bundle")]
        bundle: String,
        dest: Vec<String>,
        #[serde(default = "default_compat")]
        compat: String,
        #[serde(default)]
        required: bool,
    },

    /// Recompress images.
    Images {
        source: Vec<String>,
        dest: Vec<String>,
        #[serde(default = "default_quality")]
        quality: u8,
        #[serde(default = "default_interlace")]
        interlace: bool,
    },

    /// Copy files unchanged (a pipeline with no transforms).
    Copy {
        source: Vec<String>,
        #[serde(default = "default_root_dest")]
        dest: Vec<String>,
        #[serde(default)]
        required: bool,
    },
}

impl ActionConfig {
    /// Short kind name for logs and dry-run output.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionConfig::Clean => "clean",
            ActionConfig::Stylelint { .. } => "stylelint",
            ActionConfig::Template { .. } => "template",
            ActionConfig::Styles { .. } => "styles",
            ActionConfig::Scripts { .. } => "scripts",
            ActionConfig::Images { .. } => "images",
            ActionConfig::Copy { .. } => "copy",
        }
    }
}

fn default_report_dir() -> String {
    "reports/lint".to_string()
}

fn default_root_dest() -> Vec<String> {
    vec![String::new()]
}

fn default_compat() -> String {
    "*".to_string()
}

fn default_bundle() -> String {
    "bundle.js".to_string()
}

fn default_quality() -> u8 {
    80
}

fn default_interlace() -> bool {
    true
}

/// `[task.<name>.targets]`: browser-target versions for style compilation,
/// e.g. `chrome = "109"` or `safari = "15.6"`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetsSection {
    pub chrome: Option<String>,
    pub edge: Option<String>,
    pub firefox: Option<String>,
    pub safari: Option<String>,
    pub ios: Option<String>,
    pub opera: Option<String>,
    pub android: Option<String>,
}

impl TargetsSection {
    /// Convert to lightningcss browser targets. An empty section falls back
    /// to a conservative built-in set.
    pub fn to_browsers(&self) -> Result<Browsers, String> {
        let all_unset = self.chrome.is_none()
            && self.edge.is_none()
            && self.firefox.is_none()
            && self.safari.is_none()
            && self.ios.is_none()
            && self.opera.is_none()
            && self.android.is_none();

        if all_unset {
            return Ok(Browsers {
                chrome: Some(encode_version(109, 0, 0)),
                edge: Some(encode_version(109, 0, 0)),
                firefox: Some(encode_version(115, 0, 0)),
                safari: Some(encode_version(15, 6, 0)),
                ..Browsers::default()
            });
        }

        Ok(Browsers {
            chrome: parse_version(self.chrome.as_deref())?,
            edge: parse_version(self.edge.as_deref())?,
            firefox: parse_version(self.firefox.as_deref())?,
            safari: parse_version(self.safari.as_deref())?,
            ios_saf: parse_version(self.ios.as_deref())?,
            opera: parse_version(self.opera.as_deref())?,
            android: parse_version(self.android.as_deref())?,
            ..Browsers::default()
        })
    }
}

/// Parse `"109"` / `"15.6"` / `"15.6.1"` into the packed version encoding
/// lightningcss expects.
fn parse_version(version: Option<&str>) -> Result<Option<u32>, String> {
    let Some(version) = version else {
        return Ok(None);
    };

    let mut parts = version.trim().split('.');
    let mut next = |name: &str| -> Result<u32, String> {
        match parts.next() {
            None => Ok(0),
            Some(p) => p
                .parse::<u32>()
                .map_err(|_| format!("invalid {name} in browser version '{version}'")),
        }
    };

    let major = next("major")?;
    let minor = next("minor")?;
    let patch = next("patch")?;
    Ok(Some(encode_version(major, minor, patch)))
}

fn encode_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}
