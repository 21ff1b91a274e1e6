//! Payment instruction building.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solshop_core::{Lamports, OrderReference};

/// SPL Memo program (v2).
pub const MEMO_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

/// Instructions for one payment: a system transfer of `lamports` from
/// `payer` to `receiver`, followed by a memo carrying `reference` if given.
#[must_use]
pub fn payment_instructions(
    payer: &Pubkey,
    receiver: &Pubkey,
    lamports: Lamports,
    reference: Option<&OrderReference>,
) -> Vec<Instruction> {
    #[allow(deprecated)] // system_instruction moved to solana-system-interface in 2.2
    let transfer = solana_sdk::system_instruction::transfer(payer, receiver, lamports.get());

    let mut instructions = vec![transfer];
    if let Some(reference) = reference {
        instructions.push(memo_instruction(payer, &reference.memo()));
    }
    instructions
}

/// A memo instruction signed by `signer`.
#[must_use]
pub fn memo_instruction(signer: &Pubkey, memo: &str) -> Instruction {
    Instruction::new_with_bytes(
        MEMO_PROGRAM_ID,
        memo.as_bytes(),
        vec![AccountMeta::new_readonly(*signer, true)],
    )
}
