//! Course list rows, operation results, and browser launch options.

use serde::{Deserialize, Serialize};

/// One action anchor from a row's trailing cell: (href, inline onclick
/// script). The script is data, never executed; see [`crate::parse`].
pub type CourseAction = (String, String);

/// Metadata carried by a row's first action script, serialized under the
/// portal's own field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInfo {
    /// Student id.
    pub xh: String,
    /// Student name.
    pub stu_name: String,
    pub course_name: String,
    pub class_no: String,
    /// Whether the course is open for supplement election only.
    pub only_supp: bool,
    /// Course index within the list.
    pub index: String,
    /// Sequence number of the election action.
    pub seq_no: String,
    /// Freshman-only flag.
    pub fresh_flag: bool,
    /// Capacity-limit marker.
    pub limited_nbr: String,
}

/// One list entry: display columns, raw action links, parsed metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CourseRow {
    /// Display-column strings as shown in the list table.
    pub row: Vec<String>,
    /// (href, inline-script) pairs from the trailing action cell.
    pub actions: Vec<CourseAction>,
    /// Parsed from `actions[0]`'s script.
    pub info: CourseInfo,
}

/// Result of an election attempt.
///
/// Rejection by the portal is a business outcome, not an error: `success` is
/// false and `message` carries the status text scraped from the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionOutcome {
    pub success: bool,
    /// Empty when `success` is true.
    pub message: String,
}

/// Launch settings for the shared browser, resolved from config.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub browser_path: Option<String>,
    pub headless: bool,
    pub user_agent: Option<String>,
    pub chrome_args: Vec<String>,
    pub navigation_timeout_ms: u64,
    pub wait_timeout_ms: u64,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            browser_path: None,
            headless: true,
            user_agent: None,
            chrome_args: Vec::new(),
            navigation_timeout_ms: 30000,
            wait_timeout_ms: 30000,
        }
    }
}

impl From<&elector_config::BrowserConfig> for LaunchOptions {
    fn from(cfg: &elector_config::BrowserConfig) -> Self {
        Self {
            browser_path: cfg.browser_path.clone(),
            headless: cfg.headless,
            user_agent: cfg.user_agent.clone(),
            chrome_args: cfg.chrome_args.clone(),
            navigation_timeout_ms: cfg.navigation_timeout_ms,
            wait_timeout_ms: cfg.wait_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_info_serializes_under_portal_names() {
        let info = CourseInfo {
            xh: "2100012345".into(),
            stu_name: "张三".into(),
            course_name: "数学分析".into(),
            class_no: "01".into(),
            only_supp: false,
            index: "3".into(),
            seq_no: "18".into(),
            fresh_flag: false,
            limited_nbr: "120".into(),
        };
        let value = serde_json::to_value(&info).expect("serialize");
        assert_eq!(value["xh"], "2100012345");
        assert_eq!(value["stuName"], "张三");
        assert_eq!(value["classNo"], "01");
        assert_eq!(value["onlySupp"], false);
        assert_eq!(value["seqNo"], "18");
        assert_eq!(value["freshFlag"], false);
        assert_eq!(value["limitedNbr"], "120");
    }

    #[test]
    fn launch_options_from_config() {
        let mut cfg = elector_config::BrowserConfig::default();
        cfg.browser_path = Some("/usr/bin/chromium".into());
        cfg.headless = false;
        cfg.navigation_timeout_ms = 5000;

        let options = LaunchOptions::from(&cfg);
        assert_eq!(options.browser_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(!options.headless);
        assert_eq!(options.navigation_timeout_ms, 5000);
        assert_eq!(options.wait_timeout_ms, 30000);
    }
}
