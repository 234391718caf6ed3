use scopebus::{init_logging, json, log_error, Registry, Settings};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(settings.logging())?;

    let registry = Registry::with_settings(&settings);

    registry.define("chat", |room, args| {
        let title = args
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or("untitled")
            .to_string();
        room.on("message", move |room, args| {
            info!(room = %room.scope(), %title, ?args, "message");
            Ok(())
        });
        Ok(())
    })?;

    let lobby = registry.instantiate("chat", &[json!("lobby")])?;
    registry.instantiate("chat", &[json!("random")])?;
    lobby.id("lobby");

    // Ошибки вызывающей стороны возвращаются сразу и не трогают реестр
    if let Err(err) = registry.instantiate("voice", &[]) {
        log_error(&err);
    }

    lobby.trigger("message", &[json!("hello"), json!({"from": "alice"})])?;
    registry
        .find_all("chat")
        .trigger("message", &[json!("broadcast")])?;

    if let Some(room) = registry.find_by_id("lobby") {
        room.destroy();
    }
    info!(live = registry.instance_count("chat"), "lobby closed");

    registry.destroy_all(None);
    Ok(())
}
