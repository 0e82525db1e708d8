use chrono::{DateTime, Utc};
use maud::{html, Markup};

use crate::dashboard::{days_remaining, format_bytes, StorageUsage};
use crate::db::enums::JobStatus;
use crate::models::Job;

pub fn storage_usage_bar(usage: &StorageUsage) -> Markup {
    let level = usage.level();

    html! {
        div id="storage-usage" class="space-y-2 p-4 rounded-lg border bg-white"
            data-level=(format!("{:?}", level).to_lowercase()) {
            div class="flex items-center justify-between text-sm" {
                span class="font-medium" { "Storage" }
                span class="text-gray-500" { (usage.summary()) }
            }

            div class="w-full h-2 bg-gray-200 rounded-full overflow-hidden" {
                div class=(format!("h-2 rounded-full {}", level.css_class()))
                    style=(format!("width: {}%", usage.bar_percent())) {}
            }

            p class="text-xs text-gray-500" { (usage.notice()) }
        }
    }
}

pub fn job_list(jobs: &[&Job], highlight: Option<uuid::Uuid>, now: DateTime<Utc>) -> Markup {
    html! {
        div id="job-list" class="space-y-4" {
            @if jobs.is_empty() {
                div class="text-center py-12" {
                    p class="text-gray-500" { "No meditation tracks yet." }
                }
            } @else {
                @for job in jobs {
                    (job_card(job, Some(job.id) == highlight, now))
                }
            }
        }
    }
}

pub fn job_card(job: &Job, highlighted: bool, now: DateTime<Utc>) -> Markup {
    let ring = if highlighted { " ring-2 ring-indigo-500" } else { "" };
    let heading = job
        .title()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} min meditation", job.config.duration_minutes));

    html! {
        div id=(format!("job-{}", job.id))
            class=(format!("job-card p-4 rounded-lg border bg-white{}", ring)) {

            div class="flex items-center justify-between" {
                h3 class="font-semibold text-gray-900 truncate" title=(heading) { (heading) }
                (status_badge(job.status))
            }

            p class="text-sm text-gray-500 mt-1" {
                (job.config.affirmations.len()) " affirmations · "
                (job.config.binaural_preset.as_str()) " · "
                (job.config.voice_id)
            }

            @if job.status.is_active() {
                div class="mt-3" hx-get=(format!("/partials/jobs/{}", job.id))
                    hx-trigger="every 3s" hx-target=(format!("#job-{}", job.id))
                    hx-swap="outerHTML" {
                    (progress_bar(job.progress, job.progress_message.as_deref()))
                }
            }

            @if job.status == JobStatus::Failed {
                p class="text-sm text-red-600 mt-2" {
                    (job.error_message.as_deref().unwrap_or("Unknown error"))
                }
            }

            @if job.status == JobStatus::Completed {
                div class="flex items-center justify-between mt-3 text-sm" {
                    a href=(format!("/api/files/{}", job.id))
                        download=(job.download_filename())
                        class="text-indigo-600 hover:underline" { "Download" }

                    span class="text-gray-500" {
                        @if let Some(size) = job.file_size_bytes {
                            (format_bytes(size)) " · "
                        }
                        @if let Some(completed_at) = job.completed_at {
                            (retention_label(days_remaining(completed_at, now)))
                        }
                    }
                }
            }

            @if job.status == JobStatus::Archived {
                p class="text-sm text-gray-500 mt-2" {
                    "Archived. Regenerate to get the audio file back."
                }
            }
        }
    }
}

fn retention_label(days: i64) -> String {
    match days {
        0 => "Expires today".to_string(),
        1 => "Expires in 1 day".to_string(),
        n => format!("Expires in {} days", n),
    }
}

fn progress_bar(progress: i32, message: Option<&str>) -> Markup {
    let percent = progress.clamp(0, 100);

    html! {
        div class="w-full bg-gray-200 rounded-full h-2" {
            div class="bg-indigo-500 h-2 rounded-full" style=(format!("width: {}%", percent)) {}
        }
        p class="text-xs text-gray-500 mt-1" {
            (percent) "%"
            @if let Some(message) = message {
                " · " (message)
            }
        }
    }
}

fn status_badge(status: JobStatus) -> Markup {
    let (text, color) = match status {
        JobStatus::Pending => ("Queued", "bg-gray-500"),
        JobStatus::Processing => ("Generating", "bg-blue-500"),
        JobStatus::Completed => ("Ready", "bg-green-500"),
        JobStatus::Failed => ("Failed", "bg-red-500"),
        JobStatus::Archived => ("Archived", "bg-gray-400"),
    };

    html! {
        span class=(format!("{} text-white text-xs font-semibold px-2 py-1 rounded", color)) {
            (text)
        }
    }
}
