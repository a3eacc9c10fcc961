//! Session workflow engine: one isolated browsing context driving the
//! election portal.
//!
//! Every DOM lookup happens against the current document; nothing caches
//! element handles across navigations, because each navigation replaces the
//! document wholesale (this matters for pagination, where the control's
//! position is recomputed on every page).

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    chromiumoxide::{Page, cdp::browser_protocol::browser::BrowserContextId},
    rand::Rng,
    serde::Deserialize,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Result, SessionError},
    host::BrowserHost,
    parse, site,
    types::{CourseRow, ElectionOutcome},
};

/// Poll interval for selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The captcha validation endpoint answers with this `valid` code when the
/// submitted characters are accepted.
const CAPTCHA_ACCEPTED: &str = "2";

enum Phase {
    Empty,
    Ready {
        ctx: BrowserContextId,
        page: Page,
    },
    Gone,
}

/// One logical automation session against the portal.
///
/// Owns one isolated browsing context and one page within it. Constructed and
/// destroyed through the [`Registry`](crate::registry::Registry); operations
/// serialize on an internal lock, so two concurrent calls on the same session
/// queue rather than race the shared page.
pub struct Session {
    name: String,
    host: Arc<BrowserHost>,
    phase: Mutex<Phase>,
}

impl Session {
    pub(crate) fn new(name: String, host: Arc<BrowserHost>) -> Self {
        Self {
            name,
            host,
            phase: Mutex::new(Phase::Empty),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the isolated browsing context and its page.
    pub async fn init(&self) -> Result<()> {
        let mut phase = self.phase.lock().await;
        match &*phase {
            Phase::Empty => {},
            Phase::Ready { .. } => return Err(SessionError::AlreadyInitialized),
            Phase::Gone => return Err(SessionError::SessionGone),
        }

        let ctx = self.host.create_context().await?;
        let page = match self.host.open_page(&ctx).await {
            Ok(page) => page,
            Err(e) => {
                // A context without a page is useless; don't leak it.
                if let Err(dispose_err) = self.host.dispose_context(ctx).await {
                    warn!(
                        session = self.name,
                        error = %dispose_err,
                        "failed to dispose context after page-open failure"
                    );
                }
                return Err(e);
            },
        };

        *phase = Phase::Ready { ctx, page };
        info!(session = self.name, "session initialized");
        Ok(())
    }

    /// Log in through the identity provider.
    ///
    /// Fills the credential fields, submits, and waits for the portal's
    /// success marker. The authenticated cookie state then lives in this
    /// session's browsing context.
    pub async fn login(&self, user: &str, pass: &str) -> Result<()> {
        let phase = self.phase.lock().await;
        let page = ready_page(&phase)?;

        goto(page, site::IAAA_LOGIN_URL).await?;
        type_into(page, site::USERNAME_INPUT, user).await?;
        type_into(page, site::PASSWORD_INPUT, pass).await?;
        click(page, site::LOGIN_BUTTON).await?;
        wait_for_selector(page, site::LOGIN_SUCCESS_MARKER, self.host.wait_timeout()).await?;

        info!(session = self.name, "logged in");
        Ok(())
    }

    /// Load every page of the course list.
    ///
    /// Fails on the first expiry notice or malformed row; partial pages are
    /// discarded, never returned.
    pub async fn load_list(&self) -> Result<Vec<CourseRow>> {
        let phase = self.phase.lock().await;
        let page = ready_page(&phase)?;

        goto_list_view(page).await?;

        let mut raw_rows: Vec<RawRow> = Vec::new();
        loop {
            if let Some(notice) = expired_text(page).await? {
                return Err(SessionError::Expired(notice));
            }

            let mut rows: Vec<RawRow> = eval_value(page, &row_extraction_js()).await?;
            debug!(session = self.name, rows = rows.len(), "extracted page rows");
            raw_rows.append(&mut rows);

            // The pagination control is part of the regenerated document, so
            // its position is recomputed fresh on every page.
            let next_index: i64 = eval_value(page, &next_position_js()).await?;
            if next_index == 0 {
                break;
            }
            let next_anchor = format!("{} > a:nth-child({next_index})", site::PAGER_SPAN);
            click(page, &next_anchor).await?;
            wait_for_navigation(page).await?;
        }

        let rows = raw_rows
            .into_iter()
            .map(|raw| {
                let script = raw
                    .actions
                    .first()
                    .map(|(_, script)| script.clone())
                    .ok_or_else(|| SessionError::Parse("row has no action links".into()))?;
                let info = parse::parse_action_script(&script)?;
                Ok(CourseRow {
                    row: raw.cells,
                    actions: raw.actions,
                    info,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(session = self.name, rows = rows.len(), "loaded course list");
        Ok(rows)
    }

    /// Refresh the capacity counters for one course action.
    ///
    /// The request runs inside the page so the portal's cookie and
    /// same-origin rules are satisfied; the JSON body comes back verbatim
    /// (`electedNum` / `limitNum` are the caller's business).
    pub async fn refresh_limit(
        &self,
        index: &str,
        seq_no: &str,
        xh: &str,
    ) -> Result<serde_json::Value> {
        let phase = self.phase.lock().await;
        let page = ready_page(&phase)?;

        let body = form_body(&[("index", index), ("seq", seq_no), ("xh", xh)]);
        let js = format!(
            r#"async () => {{
                const resp = await fetch({url}, {{
                    method: 'POST',
                    headers: {{
                        accept: 'application/json, text/javascript, */*; q=0.01',
                        'content-type': 'application/x-www-form-urlencoded; charset=UTF-8',
                        'x-requested-with': 'XMLHttpRequest',
                    }},
                    body: {body},
                    credentials: 'include',
                }});
                return resp.json();
            }}"#,
            url = js_string(site::REFRESH_LIMIT_URL),
            body = js_string(&body),
        );
        let value: serde_json::Value = eval_function(page, &js).await?;
        debug!(session = self.name, "refreshed limit");
        Ok(value)
    }

    /// Fetch a fresh captcha challenge as a base64 data URL.
    ///
    /// Never cached; every call draws a new image.
    pub async fn load_captcha(&self) -> Result<String> {
        let phase = self.phase.lock().await;
        let page = ready_page(&phase)?;

        let bust: u32 = rand::rng().random_range(0..10_000);
        let url = format!("{}?Rand={bust}", site::DRAW_SERVLET_URL);
        let js = format!(
            r#"async () => {{
                const resp = await fetch({url}, {{
                    headers: {{
                        accept: 'image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8',
                    }},
                    credentials: 'include',
                }});
                const buf = await resp.arrayBuffer();
                return {{
                    mime: resp.headers.get('content-type') || 'image/jpeg',
                    bytes: Array.from(new Uint8Array(buf)),
                }};
            }}"#,
            url = js_string(&url),
        );
        let fetched: CaptchaFetch = eval_function(page, &js).await?;
        debug!(
            session = self.name,
            bytes = fetched.bytes.len(),
            "fetched captcha"
        );
        Ok(format!(
            "data:{};base64,{}",
            fetched.mime,
            BASE64.encode(&fetched.bytes)
        ))
    }

    /// Submit an election attempt.
    ///
    /// Phase 1 validates the captcha in-page; a rejected code aborts without
    /// navigating. Phase 2 navigates to the confirmation endpoint, races the
    /// two result markers, and classifies the outcome. Every failed attempt
    /// ends back on the list view so the session stays on a known page; a
    /// successful one stays where the portal left it.
    pub async fn elect(&self, elec_url: &str, xh: &str, code: &str) -> Result<ElectionOutcome> {
        validate_elect_url(elec_url)?;

        let phase = self.phase.lock().await;
        let page = ready_page(&phase)?;

        let body = form_body(&[("xh", xh), ("validCode", code)]);
        let js = format!(
            r#"async () => {{
                const resp = await fetch({url}, {{
                    method: 'POST',
                    headers: {{
                        accept: 'application/json, text/javascript, */*; q=0.01',
                        'content-type': 'application/x-www-form-urlencoded; charset=UTF-8',
                        'x-requested-with': 'XMLHttpRequest',
                    }},
                    body: {body},
                    credentials: 'include',
                }});
                const data = await resp.json();
                return String(data.valid ?? '');
            }}"#,
            url = js_string(site::VALIDATE_URL),
            body = js_string(&body),
        );
        let valid: String = eval_function(page, &js).await?;
        if valid != CAPTCHA_ACCEPTED {
            debug!(session = self.name, valid, "captcha rejected");
            return Err(SessionError::WrongCaptcha);
        }

        let nav = format!(
            "(() => {{ location.href = {}; return true; }})()",
            js_string(elec_url)
        );
        page.evaluate(nav.as_str())
            .await
            .map_err(|e| SessionError::Navigation(e.to_string()))?;

        wait_for_any(
            page,
            &[site::ELECT_TIPS, site::ELECT_RESULT_CELL],
            self.host.wait_timeout(),
        )
        .await?;

        let texts: ResultTexts = eval_value(page, &result_texts_js()).await?;
        let outcome = classify_outcome(&texts.cell, &texts.tips);
        info!(
            session = self.name,
            success = outcome.success,
            "election attempt finished"
        );

        if !outcome.success {
            // Land back on the list view so follow-up operations start from
            // a known page.
            goto_list_view(page).await?;
        }
        Ok(outcome)
    }

    /// Release the page and its browsing context, page first.
    ///
    /// Afterwards every operation on this session fails with a session-gone
    /// error.
    pub async fn destroy(&self) -> Result<()> {
        let mut phase = self.phase.lock().await;
        match std::mem::replace(&mut *phase, Phase::Gone) {
            Phase::Ready { ctx, page } => {
                if let Err(e) = page.close().await {
                    warn!(session = self.name, error = %e, "page close failed");
                }
                self.host.dispose_context(ctx).await?;
                info!(session = self.name, "session destroyed");
                Ok(())
            },
            Phase::Empty => Ok(()),
            Phase::Gone => Err(SessionError::SessionGone),
        }
    }
}

/// What the per-page extraction script returns before info parsing.
#[derive(Debug, Deserialize)]
struct RawRow {
    cells: Vec<String>,
    actions: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct CaptchaFetch {
    mime: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ResultTexts {
    cell: String,
    tips: String,
}

fn ready_page(phase: &Phase) -> Result<&Page> {
    match phase {
        Phase::Ready { page, .. } => Ok(page),
        Phase::Empty => Err(SessionError::NotInitialized),
        Phase::Gone => Err(SessionError::SessionGone),
    }
}

async fn goto(page: &Page, url: &str) -> Result<()> {
    page.goto(url)
        .await
        .map_err(|e| SessionError::Navigation(e.to_string()))?;
    wait_for_navigation(page).await
}

async fn wait_for_navigation(page: &Page) -> Result<()> {
    page.wait_for_navigation()
        .await
        .map_err(|e| SessionError::Navigation(e.to_string()))?;
    Ok(())
}

async fn find(page: &Page, selector: &str) -> Result<chromiumoxide::Element> {
    page.find_element(selector)
        .await
        .map_err(|e| SessionError::Evaluation(format!("element {selector}: {e}")))
}

async fn click(page: &Page, selector: &str) -> Result<()> {
    find(page, selector)
        .await?
        .click()
        .await
        .map_err(|e| SessionError::Evaluation(format!("click {selector}: {e}")))?;
    Ok(())
}

async fn type_into(page: &Page, selector: &str, text: &str) -> Result<()> {
    let element = find(page, selector).await?;
    element
        .click()
        .await
        .map_err(|e| SessionError::Evaluation(format!("focus {selector}: {e}")))?;
    element
        .type_str(text)
        .await
        .map_err(|e| SessionError::Evaluation(format!("type into {selector}: {e}")))?;
    Ok(())
}

/// Navigate to the list view the way a user would: click the menu entry and
/// wait out the navigation.
async fn goto_list_view(page: &Page) -> Result<()> {
    click(page, site::LIST_MENU_LINK).await?;
    wait_for_navigation(page).await
}

/// Evaluate an expression and deserialize its value.
async fn eval_value<T: serde::de::DeserializeOwned>(page: &Page, js: &str) -> Result<T> {
    page.evaluate(js)
        .await
        .map_err(|e| SessionError::Evaluation(e.to_string()))?
        .into_value()
        .map_err(|e| SessionError::Evaluation(format!("unexpected result shape: {e:?}")))
}

/// Evaluate a (possibly async) function and deserialize its resolved value.
async fn eval_function<T: serde::de::DeserializeOwned>(page: &Page, js: &str) -> Result<T> {
    page.evaluate_function(js)
        .await
        .map_err(|e| SessionError::Evaluation(e.to_string()))?
        .into_value()
        .map_err(|e| SessionError::Evaluation(format!("unexpected result shape: {e:?}")))
}

/// Poll until `selector` exists in the current document.
async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> Result<()> {
    let check = format!("document.querySelector({}) !== null", js_string(selector));
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        // Evaluation fails transiently while a navigation replaces the
        // document; treat that the same as "not there yet".
        let found = match page.evaluate(check.as_str()).await {
            Ok(result) => result.into_value().unwrap_or(false),
            Err(_) => false,
        };
        if found {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err(SessionError::WaitTimeout(selector.to_string()))
}

/// Poll until any of `selectors` exists; returns the one that appeared first.
async fn wait_for_any(page: &Page, selectors: &[&str], timeout: Duration) -> Result<String> {
    let list = serde_json::to_string(selectors)
        .map_err(|e| SessionError::Evaluation(e.to_string()))?;
    let check = format!(
        "(() => {{ for (const sel of {list}) {{ if (document.querySelector(sel)) return sel; }} return ''; }})()"
    );
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let found: String = match page.evaluate(check.as_str()).await {
            Ok(result) => result.into_value().unwrap_or_default(),
            Err(_) => String::new(),
        };
        if !found.is_empty() {
            return Ok(found);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err(SessionError::WaitTimeout(selectors.join(" | ")))
}

/// Read the expiry status cell; `Some(text)` when the session is dead.
async fn expired_text(page: &Page) -> Result<Option<String>> {
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({cell});
            return el && el.textContent ? el.textContent : '';
        }})()"#,
        cell = js_string(site::STATUS_CELL),
    );
    let text: String = eval_value(page, &js).await?;
    Ok(match_expiry(&text))
}

fn match_expiry(text: &str) -> Option<String> {
    site::EXPIRY_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
        .then(|| text.to_string())
}

/// Classify an election attempt from the two result texts.
///
/// Priority order: an "incorrect" status cell wins; otherwise the tips
/// element must carry the success phrase, else its text (possibly empty) is
/// the failure message.
fn classify_outcome(cell: &str, tips: &str) -> ElectionOutcome {
    if cell.contains(site::ELECT_FAIL_MARKER) {
        return ElectionOutcome {
            success: false,
            message: cell.to_string(),
        };
    }
    if !tips.contains(site::ELECT_SUCCESS_MARKER) {
        return ElectionOutcome {
            success: false,
            message: tips.to_string(),
        };
    }
    ElectionOutcome {
        success: true,
        message: String::new(),
    }
}

/// The election confirmation URL must point at the portal; anything else is
/// rejected before any navigation happens.
fn validate_elect_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| SessionError::InvalidElectUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {},
        scheme => {
            return Err(SessionError::InvalidElectUrl(format!(
                "unsupported scheme '{scheme}'"
            )));
        },
    }
    if parsed.host_str() != Some(site::ELECTIVE_HOST) {
        return Err(SessionError::InvalidElectUrl(format!(
            "not on {}",
            site::ELECTIVE_HOST
        )));
    }
    Ok(())
}

/// Embed a Rust string as a quoted JS string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

fn form_body(fields: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn row_extraction_js() -> String {
    format!(
        r#"(() => {{
            const tbody = document.querySelector({tbody});
            if (!tbody) return [];
            return [...tbody.querySelectorAll('tr')]
                .filter((tr) => {classes}.some((cls) => tr.classList.contains(cls)))
                .map((tr) => {{
                    const tds = [...tr.querySelectorAll('td')];
                    const action = tds.pop();
                    return {{
                        cells: tds.map((td) => (td.textContent || '').trim()),
                        actions: action
                            ? [...action.querySelectorAll('a')].map((a) => [
                                  a.href,
                                  a.getAttribute('onclick') || '',
                              ])
                            : [],
                    }};
                }});
        }})()"#,
        tbody = js_string(site::LIST_TBODY),
        classes = serde_json::to_string(site::ROW_CLASSES).unwrap_or_else(|_| String::from("[]")),
    )
}

/// 1-based position of the "Next" anchor among the pagination control's
/// children, 0 when there is no further page.
fn next_position_js() -> String {
    format!(
        r#"(() => {{
            const span = document.querySelector({span});
            if (!span) return 0;
            const children = [...span.children];
            return children.findIndex((el) => (el.textContent || '').trim() === {label}) + 1;
        }})()"#,
        span = js_string(site::PAGER_SPAN),
        label = js_string(site::NEXT_LABEL),
    )
}

fn result_texts_js() -> String {
    format!(
        r#"(() => {{
            const text = (sel) => {{
                const el = document.querySelector(sel);
                return el && el.textContent ? el.textContent.trim() : '';
            }};
            return {{ cell: text({cell}), tips: text({tips}) }};
        }})()"#,
        cell = js_string(site::ELECT_RESULT_CELL),
        tips = js_string(site::ELECT_TIPS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_matches_either_marker() {
        assert_eq!(
            match_expiry("会话超时，请重新登录").as_deref(),
            Some("会话超时，请重新登录")
        );
        assert_eq!(
            match_expiry("检测到刷课机行为").as_deref(),
            Some("检测到刷课机行为")
        );
        assert_eq!(match_expiry(""), None);
        assert_eq!(match_expiry("正常页面内容"), None);
    }

    #[test]
    fn outcome_incorrect_cell_wins() {
        let outcome = classify_outcome("验证码不正确", "选课成功");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "验证码不正确");
    }

    #[test]
    fn outcome_tips_without_success_fails() {
        let outcome = classify_outcome("", "该课程已满");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "该课程已满");
    }

    #[test]
    fn outcome_empty_tips_fails_with_empty_message() {
        let outcome = classify_outcome("", "");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "");
    }

    #[test]
    fn outcome_success() {
        let outcome = classify_outcome("", "补选成功");
        assert!(outcome.success);
        assert_eq!(outcome.message, "");
    }

    #[test]
    fn outcome_is_exclusive() {
        // One classification per input, by construction; spot-check the
        // cell-over-tips priority with conflicting texts.
        let outcome = classify_outcome("不正确", "");
        assert_eq!(outcome.message, "不正确");
    }

    #[test]
    fn elect_url_must_target_the_portal() {
        assert!(validate_elect_url(
            "https://elective.pku.edu.cn/elective2008/edu/pku/stu/elective/controller/supplement/electSupplement.do?index=3"
        )
        .is_ok());
        assert!(validate_elect_url("http://elective.pku.edu.cn/x").is_ok());
        assert!(validate_elect_url("https://evil.example.com/elective2008/").is_err());
        assert!(validate_elect_url("javascript:alert(1)").is_err());
        assert!(validate_elect_url("not a url").is_err());
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a'b\"c"), r#""a'b\"c""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
    }

    #[test]
    fn form_body_urlencodes_fields() {
        let body = form_body(&[("index", "3"), ("seq", "18"), ("xh", "21 00&1")]);
        assert_eq!(body, "index=3&seq=18&xh=21+00%261");
    }

    #[test]
    fn row_extraction_js_embeds_row_classes() {
        let js = row_extraction_js();
        assert!(js.contains("datagrid-even"));
        assert!(js.contains("datagrid-odd"));
        assert!(js.contains("datagrid-all"));
    }

    #[test]
    fn raw_row_deserializes_from_page_shape() {
        let value = serde_json::json!({
            "cells": ["数学分析", "01", "4.0"],
            "actions": [["https://elective.pku.edu.cn/x.do", "return confirmSelectUnder('a','b','c','01',false,'3','18',false,'1')"]],
        });
        let raw: RawRow = serde_json::from_value(value).expect("deserialize");
        assert_eq!(raw.cells.len(), 3);
        assert_eq!(raw.actions.len(), 1);
        assert!(raw.actions[0].1.contains("confirmSelectUnder"));
    }
}
