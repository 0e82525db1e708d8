use maud::{html, Markup, DOCTYPE};

pub fn base_layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" class="h-full" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " - Entrain" }

                // TailwindCSS
                script src="https://cdn.tailwindcss.com" {}

                // HTMX for polling partials
                script src="https://unpkg.com/htmx.org@1.9.10" {}
            }
            body class="h-full bg-gray-50" {
                div class="min-h-full" {
                    // Navigation
                    (nav_bar())

                    // Main content
                    main class="container mx-auto px-4 py-8 max-w-3xl" {
                        (content)
                    }
                }
            }
        }
    }
}

fn nav_bar() -> Markup {
    html! {
        nav class="bg-white shadow-sm" {
            div class="container mx-auto px-4" {
                div class="flex justify-between items-center h-16" {
                    // Brand
                    a href="/dashboard" class="text-xl font-bold text-gray-900" { "Entrain" }

                    // Navigation links
                    div class="flex space-x-4" {
                        a href="/dashboard" class="text-gray-700 px-3 py-2 rounded-md text-sm font-medium" {
                            "My Tracks"
                        }
                    }
                }
            }
        }
    }
}
