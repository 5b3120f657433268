use crate::bridge_context::BridgeContext;
use crate::flow::AuthStatus;
use crate::icons;
use crate::protocol::Wallet;
use dioxus::prelude::*;
use std::rc::Rc;

#[component]
pub fn ConnectWallet(on_connected: EventHandler<()>) -> Element {
    let bridge = use_context::<BridgeContext>();
    let status = use_signal(|| AuthStatus::Idle);

    let flow = use_hook(|| {
        let flow = bridge.auth_flow();
        flow.subscribe(move |next| {
            let mut status = status;
            status.set(next.clone());
        });
        flow
    });

    let router = use_hook(|| {
        let router = Rc::new(bridge.router());
        let flow = flow.clone();
        router.on_message(move |event| {
            let flow = flow.clone();
            let event = event.clone();
            // Session is persisted before the status flips to connected
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = flow.handle_event(&event).await {
                    log::error!("wallet_connected handling failed: {}", e);
                }
            });
        });
        router
    });
    use_drop({
        let router = router.clone();
        move || router.cleanup()
    });

    use_effect(move || {
        if matches!(status(), AuthStatus::Connected { .. }) {
            on_connected.call(());
        }
    });

    let connecting = status() == AuthStatus::Connecting;
    let connect = move |wallet: Wallet| {
        let flow = flow.clone();
        spawn(async move {
            flow.connect(wallet).await;
        });
    };
    let connect_keplr = connect.clone();
    let connect_leap = connect;

    rsx! {
        div { class: "max-w-md mx-auto mt-10 p-8 bg-white rounded-lg shadow-lg",
            div { class: "text-center mb-8",
                h1 { class: "text-3xl font-bold text-gray-900 mb-2", "Welcome to Jarvis" }
                p { class: "text-gray-600", "Your AI-powered Akash Cloud Manager" }
            }

            div { class: "space-y-4",
                for (wallet, on_click) in [(Wallet::Keplr, connect_keplr.clone()), (Wallet::Leap, connect_leap.clone())] {
                    button {
                        key: "{wallet.as_str()}",
                        class: "w-full flex items-center justify-center bg-cyan-500 text-black font-bold py-3 px-4 rounded-lg hover:bg-cyan-600 transition disabled:opacity-50 disabled:cursor-not-allowed",
                        disabled: connecting,
                        onclick: move |_| on_click(wallet),
                        icons::Wallet { class: Some("w-5 h-5 mr-2".to_string()) }
                        span { "Connect {wallet.label()} Wallet" }
                    }
                }
            }

            match status() {
                AuthStatus::Connecting => rsx! {
                    div { class: "mt-6 flex items-center text-sm text-gray-600",
                        icons::Loader { class: Some("w-4 h-4 mr-2 animate-spin".to_string()) }
                        "Finish connecting in the wallet window..."
                    }
                },
                AuthStatus::Failed { message } => rsx! {
                    div { class: "mt-6 flex items-center text-sm text-red-700",
                        icons::AlertCircle { class: Some("w-4 h-4 mr-2".to_string()) }
                        "{message}"
                    }
                },
                AuthStatus::Connected { .. } => rsx! {
                    div { class: "mt-6 flex items-center text-sm text-green-700",
                        icons::CheckCircle { class: Some("w-4 h-4 mr-2".to_string()) }
                        "Wallet connected"
                    }
                },
                AuthStatus::Idle => rsx! {},
            }

            div { class: "mt-8 pt-6 border-t border-gray-200",
                p { class: "text-sm text-gray-500 text-center", "Powered by Akash Network" }
            }
        }
    }
}
