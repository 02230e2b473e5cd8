//! Record identifiers

use chrono::Utc;
use rand::RngCore;

/// `<prefix>_<unix seconds in hex>_<12 random hex digits>`
pub fn generate_id(prefix: &str) -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    let random: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}_{:x}_{}", prefix, Utc::now().timestamp(), random)
}
