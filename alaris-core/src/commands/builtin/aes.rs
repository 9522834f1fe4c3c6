use std::sync::Arc;

use alaris_common::traits::{CommandContext, HandlerResult};

use crate::crypto::Encryptor;

/// `aes <encrypt | decrypt> text...`. Missing action or text is ignored.
pub async fn handle_aes(encryptor: Arc<Encryptor>, ctx: CommandContext, tokens: Vec<String>) -> HandlerResult {
    let Some((action, rest)) = tokens.split_first() else {
        return Ok(());
    };
    let text = rest.join(" ");
    if text.is_empty() {
        return Ok(());
    }

    if action.eq_ignore_ascii_case("decrypt") {
        let plain = encryptor.decrypt(&text)?;
        ctx.reply(&plain);
    } else if action.eq_ignore_ascii_case("encrypt") {
        handle_aes_encrypt(encryptor, ctx, [Some(text)]).await?;
    }
    Ok(())
}

/// The `aes encrypt` sub-command; `aes` delegates here.
pub async fn handle_aes_encrypt(encryptor: Arc<Encryptor>, ctx: CommandContext, args: [Option<String>; 1]) -> HandlerResult {
    let [Some(text)] = args else {
        return Ok(());
    };
    ctx.reply(&encryptor.encrypt(&text)?);
    Ok(())
}
