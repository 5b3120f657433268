mod connect_wallet;
mod payment_panel;

pub use connect_wallet::ConnectWallet;
pub use payment_panel::PaymentPanel;
