//! Fixed selectors and endpoints of the election portal.
//!
//! All of these mirror the live site's markup and URL layout. They are a
//! fixed external contract, kept as plain constants on purpose; there is no
//! configurable scraping layer behind them.

/// Identity-provider login page, bouncing back to the election site.
pub const IAAA_LOGIN_URL: &str = "https://iaaa.pku.edu.cn/iaaa/oauth.jsp?appID=syllabus&appName=%E5%AD%A6%E7%94%9F%E9%80%89%E8%AF%BE%E7%B3%BB%E7%BB%9F&redirectUrl=http://elective.pku.edu.cn:80/elective2008/ssoLogin.do";

/// Host every election endpoint (and every `elecUrl`) must live on.
pub const ELECTIVE_HOST: &str = "elective.pku.edu.cn";

/// Capacity-refresh endpoint (form-encoded POST, JSON response).
pub const REFRESH_LIMIT_URL: &str = "https://elective.pku.edu.cn/elective2008/edu/pku/stu/elective/controller/supplement/refreshLimit.do";

/// Captcha validation endpoint (form-encoded POST, JSON response).
pub const VALIDATE_URL: &str = "https://elective.pku.edu.cn/elective2008/edu/pku/stu/elective/controller/supplement/validate.do";

/// Captcha image endpoint; takes a cache-busting `Rand` query parameter.
pub const DRAW_SERVLET_URL: &str = "https://elective.pku.edu.cn/elective2008/DrawServlet";

// Login page elements.
pub const USERNAME_INPUT: &str = "#user_name";
pub const PASSWORD_INPUT: &str = "#password";
pub const LOGIN_BUTTON: &str = "#logon_button";
pub const LOGIN_SUCCESS_MARKER: &str = ".pkuportal-remark";

/// Menu entry that navigates to the supplement/election list view.
pub const LIST_MENU_LINK: &str = "#menu > li:nth-child(4) > a";

/// Status cell that carries expiry / anti-automation notices.
pub const STATUS_CELL: &str = "body > div > table > tbody > tr:nth-child(9) > td > table > tbody > tr > td:nth-child(2) > table > tbody > tr > td";

/// Body of the course list table.
pub const LIST_TBODY: &str = "body > table:nth-child(3) > tbody > tr:nth-child(8) > td > table > tbody";

/// Pagination control at the bottom of the list table.
pub const PAGER_SPAN: &str = "body > table:nth-child(3) > tbody > tr:nth-child(8) > td > table > tbody > tr:last-child > td:nth-child(1)";

/// Row classes that mark actual data rows (as opposed to header/filler).
pub const ROW_CLASSES: &[&str] = &["datagrid-even", "datagrid-odd", "datagrid-all"];

/// Label of the next-page anchor inside the pagination control.
pub const NEXT_LABEL: &str = "Next";

// Election result elements.
pub const ELECT_TIPS: &str = "#msgTips";
pub const ELECT_RESULT_CELL: &str = "body > div > table > tbody > tr:nth-child(9) > td";

/// Phrases in the status cell that mean the session is no longer usable:
/// "会话超时" (session timeout) and "刷课机" (automation detected).
pub const EXPIRY_MARKERS: &[&str] = &["会话超时", "刷课机"];

/// Status-cell phrase marking a rejected election ("不正确", incorrect).
pub const ELECT_FAIL_MARKER: &str = "不正确";

/// Tips phrase marking a successful election ("成功", success).
pub const ELECT_SUCCESS_MARKER: &str = "成功";
