pub mod bridge_context;
pub mod clock;
pub mod config;
pub mod error;
pub mod flow;
pub mod protocol;
pub mod relay;
pub mod router;
pub mod scheduler;
pub mod services;
pub mod token;
pub mod transport;
pub mod worker;

#[cfg(feature = "dioxus")]
mod components;
#[cfg(feature = "dioxus")]
pub mod icons;

#[cfg(test)]
mod testing;

pub use error::{BridgeError, Result};

#[cfg(feature = "dioxus")]
use bridge_context::BridgeContext;
#[cfg(feature = "dioxus")]
use components::{ConnectWallet, PaymentPanel};
#[cfg(feature = "dioxus")]
use dioxus::prelude::*;

#[cfg(feature = "dioxus")]
#[derive(Clone, PartialEq)]
enum AppState {
    Loading,
    Connect,
    Dashboard,
}

#[cfg(feature = "dioxus")]
#[component]
fn App() -> Element {
    let state = use_signal(|| AppState::Loading);

    // Global bridge context
    let bridge = use_context_provider(BridgeContext::browser);

    use_future(move || {
        let flow = bridge.auth_flow();
        let mut state = state;
        async move {
            let restored = match flow.restore().await {
                Ok(restored) => restored,
                Err(e) => {
                    log::warn!("Could not restore session: {}", e);
                    false
                }
            };
            state.set(if restored {
                AppState::Dashboard
            } else {
                AppState::Connect
            });
        }
    });

    rsx! {
        div { class: "min-h-screen bg-gray-50 p-4",
            match state() {
                AppState::Loading => rsx! {
                    div { class: "flex justify-center mt-20",
                        icons::Loader { class: Some("w-8 h-8 text-cyan-500 animate-spin".to_string()) }
                    }
                },
                AppState::Connect => rsx! { ConnectWallet {
                    on_connected: move |_| {
                        let mut state = state;
                        state.set(AppState::Dashboard)
                    }
                } },
                AppState::Dashboard => rsx! { Dashboard {
                    on_logout: move |_| {
                        let mut state = state;
                        state.set(AppState::Connect)
                    }
                } },
            }
        }
    }
}

#[cfg(feature = "dioxus")]
#[component]
fn Dashboard(on_logout: EventHandler<()>) -> Element {
    let bridge = use_context::<BridgeContext>();

    rsx! {
        div { class: "max-w-md mx-auto mt-6 space-y-4",
            div { class: "flex items-center justify-between",
                h2 { class: "text-2xl font-bold text-gray-900", "Jarvis" }
                button {
                    class: "flex items-center text-sm text-gray-600 hover:text-gray-900",
                    onclick: move |_| {
                        let flow = bridge.auth_flow();
                        spawn(async move {
                            if let Err(e) = flow.logout().await {
                                log::error!("Logout failed: {}", e);
                            }
                            on_logout.call(());
                        });
                    },
                    icons::LogOut { class: Some("w-4 h-4 mr-1".to_string()) }
                    span { "Disconnect" }
                }
            }

            PaymentPanel {}
        }
    }
}

#[cfg(feature = "dioxus")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn run() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Jarvis popup starting...");
    dioxus::launch(App);
}
