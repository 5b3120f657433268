// Lucide icons used by the status lines and wallet buttons

use dioxus::prelude::*;

fn lucide(class: Option<String>, shapes: Element) -> Element {
    rsx! {
        svg {
            class: "{class.unwrap_or_default()}",
            xmlns: "http://www.w3.org/2000/svg",
            width: "24",
            height: "24",
            view_box: "0 0 24 24",
            fill: "none",
            stroke: "currentColor",
            stroke_width: "2",
            stroke_linecap: "round",
            stroke_linejoin: "round",
            {shapes}
        }
    }
}

#[component]
pub fn CheckCircle(class: Option<String>) -> Element {
    lucide(class, rsx! {
        circle { cx: "12", cy: "12", r: "10" }
        path { d: "m9 12 2 2 4-4" }
    })
}

#[component]
pub fn AlertCircle(class: Option<String>) -> Element {
    lucide(class, rsx! {
        circle { cx: "12", cy: "12", r: "10" }
        line { x1: "12", x2: "12", y1: "8", y2: "12" }
        line { x1: "12", x2: "12.01", y1: "16", y2: "16" }
    })
}

/// Spinner; pair with `animate-spin`
#[component]
pub fn Loader(class: Option<String>) -> Element {
    lucide(class, rsx! {
        path { d: "M21 12a9 9 0 1 1-6.219-8.56" }
    })
}

#[component]
pub fn Wallet(class: Option<String>) -> Element {
    lucide(class, rsx! {
        path { d: "M19 7V4a1 1 0 0 0-1-1H5a2 2 0 0 0 0 4h15a1 1 0 0 1 1 1v4h-3a2 2 0 0 0 0 4h3a1 1 0 0 0 1-1v-2a1 1 0 0 0-1-1" }
        path { d: "M3 5v14a2 2 0 0 0 2 2h15a1 1 0 0 0 1-1v-4" }
    })
}

#[component]
pub fn LogOut(class: Option<String>) -> Element {
    lucide(class, rsx! {
        path { d: "M9 21H5a2 2 0 0 1-2-2V5a2 2 0 0 1 2-2h4" }
        polyline { points: "16 17 21 12 16 7" }
        line { x1: "21", x2: "9", y1: "12", y2: "12" }
    })
}
