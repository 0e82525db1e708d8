use maud::{html, Markup};
use uuid::Uuid;

use super::layout::base_layout;

/// Dashboard shell. Storage and the job list load as partials so they can be
/// refreshed independently.
pub fn dashboard_page(highlight: Option<Uuid>) -> Markup {
    let jobs_url = match highlight {
        Some(id) => format!("/partials/jobs?job={}", id),
        None => "/partials/jobs".to_string(),
    };

    base_layout(
        "My Tracks",
        html! {
            div class="space-y-4" {
                div hx-get="/partials/storage" hx-trigger="load, jobs-changed from:body" {}

                div hx-get=(jobs_url) hx-trigger="load" {
                    div class="flex flex-col items-center justify-center py-12 gap-3" {
                        div class="animate-spin rounded-full h-8 w-8 border-b-2 border-gray-400" {}
                        p class="text-sm text-gray-500" { "Loading your tracks..." }
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_page_passes_highlight_to_job_partial() {
        let id = Uuid::new_v4();
        let html = dashboard_page(Some(id)).into_string();
        assert!(html.contains(&format!("/partials/jobs?job={}", id)));
        assert!(html.contains("/partials/storage"));
    }
}
