//! Scrapes the Puppeteer documentation sidebar.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::timeout;

use super::ActionOutcome;
use crate::config::Timeouts;
use crate::engine::{wait_for_function, Page};
use crate::{ActionError, Result};

pub const DOCS_URL: &str = "https://pptr.dev/category/introduction";

const SIDEBAR_READY: &str = r#"document.querySelectorAll(".theme-doc-sidebar-item-category .menu__link").length !== 0"#;

const SIDEBAR_LINKS: &str = r#"Array.from(document.querySelectorAll(".theme-doc-sidebar-item-category .menu__link")).map((link) => ({ text: link.textContent, url: link.href }))"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SidebarLink {
    pub text: String,
    pub url: String,
}

pub async fn run(page: &dyn Page, timeouts: &Timeouts) -> Result<ActionOutcome> {
    timeout(timeouts.navigation, page.navigate(DOCS_URL))
        .await
        .map_err(|_| {
            ActionError::automation(format!(
                "Navigation timeout of {} ms exceeded",
                timeouts.navigation.as_millis()
            ))
        })??;

    wait_for_function(page, SIDEBAR_READY, timeouts.wait, timeouts.wait_poll).await?;

    let links: Vec<SidebarLink> = serde_json::from_value(page.evaluate(SIDEBAR_LINKS).await?)?;

    Ok(ActionOutcome::Json(json!({ "sidebar_links": links })))
}
