//! Chain-family strategies.
//!
//! | Family | Native API                      | Events                 |
//! |--------|---------------------------------|------------------------|
//! | EVM    | EIP-1193 `request`              | `on`/`removeListener`  |
//! | UTXO   | UniSat methods + explorer HTTP  | `on`/`removeListener`  |
//! | Tron   | `tronLink.request` + `tronWeb`  | host `postMessage`     |

mod evm;
mod tron;
mod utxo;

pub use evm::{EvmFamily, SignatureParts};
pub use tron::{TronFamily, decode_message as decode_tron_message};
pub use utxo::UtxoFamily;
