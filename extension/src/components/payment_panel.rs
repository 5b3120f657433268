use crate::bridge_context::BridgeContext;
use crate::flow::payment::truncate_hash;
use crate::flow::{PaymentSnapshot, PaymentStatus};
use crate::icons;
use crate::protocol::Wallet;
use dioxus::prelude::*;
use std::rc::Rc;

#[component]
pub fn PaymentPanel() -> Element {
    let bridge = use_context::<BridgeContext>();
    let view = use_signal(|| None::<PaymentSnapshot>);

    let flow = use_hook(|| {
        let flow = bridge.payment_flow();
        flow.subscribe(move |snapshot| {
            let mut view = view;
            view.set(Some(snapshot.clone()));
        });
        flow
    });

    // Router lives exactly as long as this panel
    let router = use_hook(|| {
        let router = Rc::new(bridge.router());
        let flow = flow.clone();
        router.on_message(move |event| flow.handle_event(event));
        router
    });
    use_drop({
        let router = router.clone();
        move || router.cleanup()
    });

    let snapshot = view().unwrap_or_else(|| flow.snapshot());
    let busy = snapshot.status == PaymentStatus::Processing;

    let flow_toggle = flow.clone();
    let flow_amount = flow.clone();
    let flow_wallet = flow.clone();
    let flow_submit = flow.clone();

    rsx! {
        div { class: "w-full bg-white rounded-lg shadow-lg",
            button {
                class: "w-full flex items-center justify-between px-4 py-3 text-gray-900 font-medium",
                onclick: move |_| {
                    if flow_toggle.snapshot().open { flow_toggle.close() } else { flow_toggle.open() }
                },
                div { class: "flex items-center",
                    icons::Wallet { class: Some("w-5 h-5 mr-2 text-cyan-500".to_string()) }
                    span { "Add Funds" }
                }
            }

            if snapshot.open {
                div { class: "px-4 pb-4 space-y-4 border-t border-gray-200",
                    div { class: "pt-4",
                        label { class: "block text-sm font-medium text-gray-700 mb-2", "Amount (AKT)" }
                        input {
                            class: "w-full px-4 py-2 border border-gray-300 rounded-lg focus:ring-2 focus:ring-cyan-500 focus:border-transparent",
                            r#type: "text",
                            placeholder: "0.0",
                            disabled: busy,
                            value: "{snapshot.amount}",
                            oninput: move |e| flow_amount.set_amount(e.value())
                        }
                    }

                    div {
                        label { class: "block text-sm font-medium text-gray-700 mb-2", "Wallet" }
                        select {
                            class: "w-full px-4 py-2 border border-gray-300 rounded-lg",
                            disabled: busy,
                            value: "{snapshot.wallet.as_str()}",
                            onchange: move |e| {
                                let wallet = if e.value() == "leap" { Wallet::Leap } else { Wallet::Keplr };
                                flow_wallet.select_wallet(wallet);
                            },
                            option { value: "keplr", "Keplr" }
                            option { value: "leap", "Leap" }
                        }
                    }

                    button {
                        class: "w-full bg-cyan-500 text-black font-bold py-3 px-4 rounded-lg hover:bg-cyan-600 transition disabled:opacity-50 disabled:cursor-not-allowed",
                        disabled: busy,
                        onclick: move |_| {
                            let flow = flow_submit.clone();
                            spawn(async move {
                                flow.submit().await;
                            });
                        },
                        "Pay"
                    }

                    PaymentStatusLine { status: snapshot.status.clone() }
                }
            }
        }
    }
}

#[component]
fn PaymentStatusLine(status: PaymentStatus) -> Element {
    match status {
        PaymentStatus::Idle => rsx! {},
        PaymentStatus::Processing => rsx! {
            div { class: "flex items-center text-sm text-gray-600",
                icons::Loader { class: Some("w-4 h-4 mr-2 animate-spin".to_string()) }
                "Waiting for the payment window..."
            }
        },
        PaymentStatus::Success { tx_hash } => {
            let hash = tx_hash.as_deref().map(truncate_hash).unwrap_or_default();
            rsx! {
                div { class: "flex items-center text-sm text-green-700",
                    icons::CheckCircle { class: Some("w-4 h-4 mr-2".to_string()) }
                    "Payment sent {hash}"
                }
            }
        }
        PaymentStatus::Failed { message } => rsx! {
            div { class: "flex items-center text-sm text-red-700",
                icons::AlertCircle { class: Some("w-4 h-4 mr-2".to_string()) }
                "{message}"
            }
        },
    }
}
