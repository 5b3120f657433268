// Per-handshake correlation tokens. Not a credential.

use crate::clock::Clock;
use crate::protocol::SessionToken;
use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 10;

pub fn generate_token(clock: &dyn Clock) -> SessionToken {
    generate_token_with(clock, &mut rand::thread_rng())
}

pub fn generate_token_with(clock: &dyn Clock, rng: &mut impl Rng) -> SessionToken {
    let mut token = to_base36(clock.now_millis());
    for _ in 0..RANDOM_LEN {
        token.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }
    SessionToken(token)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
