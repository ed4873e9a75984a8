//! Typed navigation targets for the backend "navigate" tool.

use voice_ops_types::{AppPage, NavigateRequest, NavigationParams};

use crate::error::{VoiceError, VoiceResult};

/// A validated destination: the client path plus the params the client
/// receives alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub page: AppPage,
    pub route: String,
    pub params: NavigationParams,
}

impl NavigationTarget {
    pub fn page(page: AppPage) -> Self {
        Self {
            page,
            route: page.path().to_string(),
            params: NavigationParams::Page { page },
        }
    }

    pub fn job(job_id: &str) -> Self {
        Self {
            page: AppPage::Jobs,
            route: format!("/jobs/{}", job_id),
            params: NavigationParams::Job {
                job_id: job_id.to_string(),
            },
        }
    }

    pub fn contact(contact_id: &str) -> Self {
        Self {
            page: AppPage::Contacts,
            route: format!("/contacts/{}", contact_id),
            params: NavigationParams::Contact {
                contact_id: contact_id.to_string(),
            },
        }
    }

    /// Resolve a page name plus optional item ids.
    ///
    /// A job id only specializes the `jobs` page and a contact id only the
    /// `contacts` page; otherwise ids are ignored.
    pub fn resolve(
        page: &str,
        job_id: Option<&str>,
        contact_id: Option<&str>,
    ) -> VoiceResult<Self> {
        let page = AppPage::parse(page).ok_or_else(|| {
            let valid: Vec<&str> = AppPage::ALL.iter().map(|p| p.as_str()).collect();
            VoiceError::Validation(format!(
                "Invalid page: {}. Valid pages are: {}",
                page,
                valid.join(", ")
            ))
        })?;

        let job_id = job_id.map(str::trim).filter(|id| !id.is_empty());
        let contact_id = contact_id.map(str::trim).filter(|id| !id.is_empty());

        Ok(match (page, job_id, contact_id) {
            (AppPage::Jobs, Some(id), _) => Self::job(id),
            (AppPage::Contacts, _, Some(id)) => Self::contact(id),
            (page, _, _) => Self::page(page),
        })
    }

    pub fn from_request(request: &NavigateRequest) -> VoiceResult<Self> {
        Self::resolve(
            &request.page,
            request.job_id.as_deref(),
            request.contact_id.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_paths() {
        let target = NavigationTarget::resolve("finance", None, None).unwrap();
        assert_eq!(target.route, "/finance/dashboard");
        assert_eq!(
            target.params,
            NavigationParams::Page {
                page: AppPage::Finance
            }
        );
        assert_eq!(
            NavigationTarget::resolve("dashboard", None, None).unwrap().route,
            "/jobs"
        );
    }

    #[test]
    fn test_item_specialization() {
        let job = NavigationTarget::resolve("jobs", Some("J42"), None).unwrap();
        assert_eq!(job.route, "/jobs/J42");
        assert_eq!(
            job.params,
            NavigationParams::Job {
                job_id: "J42".into()
            }
        );

        let contact = NavigationTarget::resolve("contacts", None, Some("C7")).unwrap();
        assert_eq!(contact.route, "/contacts/C7");

        // ids only specialize their own page
        let inbox = NavigationTarget::resolve("inbox", Some("J42"), None).unwrap();
        assert_eq!(inbox.route, "/inbox");
        let blank = NavigationTarget::resolve("jobs", Some("  "), None).unwrap();
        assert_eq!(blank.route, "/jobs");
    }

    #[test]
    fn test_unknown_page_lists_valid_pages() {
        let err = NavigationTarget::resolve("billing", None, None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Invalid page: billing"));
        assert!(message.contains("email-templates"));
        assert!(matches!(err, VoiceError::Validation(_)));
    }
}
