#![forbid(unsafe_code)]

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use vcl_client_core::linkify::plain_text;
use vcl_client_core::{ClientConfig, ClientController, HttpDashboardApi, UiEvent, start_client};
use vcl_domain::StreamId;

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: vcl_client [--connect ws://host:port/path] [--stream ID] [--lang CODE]\n\
\n\
Options:\n\
	--connect   Dashboard channel endpoint (alias: --endpoint)\n\
	            Default: config file, VCL_SERVER_ENDPOINT, or ws://127.0.0.1:5000/ws\n\
	--stream    Stream to start on (e.g. LIVE, PTU)\n\
	--lang      UI language (default: the dashboard's setting)\n\
	--help      Show this help\n\
\n\
Commands on stdin:\n\
	keep | discard          answer the session prompt\n\
	switch ID               switch the active stream\n\
	player NAME             open a player profile\n\
	lang CODE               change the language\n\
	reset [total]           reset the session (optionally also the totals)\n\
	clear                   clear the event timeline\n\
	names                   reload display names\n\
	start | stop            start or stop log monitoring\n\
	quit\n"
	);
	std::process::exit(2)
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,vcl_client_core=debug".to_string());
	tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_args(cfg: &mut ClientConfig) {
	let mut it = std::env::args().skip(1);
	while let Some(arg) = it.next() {
		match arg.as_str() {
			"--help" | "-h" => usage_and_exit(),
			"--connect" | "--endpoint" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				if v.trim().is_empty() {
					eprintln!("--connect must be non-empty (expected ws://host:port/path)");
					usage_and_exit();
				}
				cfg.server_endpoint = v;
			}
			"--stream" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				let stream = StreamId::new(v.trim()).unwrap_or_else(|e| {
					eprintln!("Invalid --stream value: {v}\n{e}");
					usage_and_exit()
				});
				cfg.initial_stream = Some(stream);
			}
			"--lang" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				if v.trim().is_empty() {
					eprintln!("--lang must be non-empty");
					usage_and_exit();
				}
				cfg.language = Some(v.trim().to_string());
			}
			other => {
				eprintln!("Unknown argument: {other}");
				usage_and_exit();
			}
		}
	}

	if let Err(e) = cfg.endpoint() {
		eprintln!("Invalid --connect value: {}\n{e}", cfg.server_endpoint);
		usage_and_exit();
	}
}

fn print_event(ev: &UiEvent) {
	match ev {
		UiEvent::TimelineEntryAdded { entry, .. } => println!("{} {}", entry.time_label, plain_text(&entry.text)),
		UiEvent::TimelineTimersUpdated(_) => {}
		UiEvent::Status { indicator, label } => println!("{} {label}", indicator.icon()),
		UiEvent::Stats { stream, session, total } => println!(
			"[{stream}] session: kills {} deaths {} K/D {} | total: kills {} deaths {} K/D {}",
			session.kills, session.deaths, session.kd_ratio, total.kills, total.deaths, total.kd_ratio
		),
		UiEvent::ArbitrationPrompt {
			title,
			question,
			countdown,
			..
		} => println!("{title}: {question} (keep/discard) {countdown}"),
		UiEvent::ArbitrationCountdown { countdown, .. } => println!("  {countdown}"),
		UiEvent::ArbitrationClosed { message, .. } => println!("{message}"),
		UiEvent::Notification { message, .. } => println!("* {message}"),
		UiEvent::OverlayShown { message } => println!("... {message}"),
		UiEvent::PlayerProfile(profile) => println!("{profile:#?}"),
		other => info!(event = ?other, "ui event"),
	}
}

async fn dispatch_line(controller: &ClientController, line: &str) -> Result<bool, String> {
	let mut parts = line.split_whitespace();
	let Some(cmd) = parts.next() else {
		return Ok(true);
	};
	let rest = parts.collect::<Vec<_>>().join(" ");
	match cmd {
		"keep" => controller.respond_arbitration(true).await?,
		"discard" => controller.respond_arbitration(false).await?,
		"switch" => match StreamId::new(rest.as_str()) {
			Ok(stream) => controller.switch_stream(stream).await?,
			Err(e) => eprintln!("{e}"),
		},
		"player" if !rest.is_empty() => controller.open_player(rest).await?,
		"lang" if !rest.is_empty() => controller.change_language(rest).await?,
		"reset" => controller.reset_session(rest == "total").await?,
		"clear" => controller.clear_timeline().await?,
		"names" => controller.refresh_name_mappings().await?,
		"start" => controller.start_monitoring().await?,
		"stop" => controller.stop_monitoring().await?,
		"quit" | "exit" => return Ok(false),
		other => eprintln!("unknown command: {other}"),
	}
	Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();

	let mut cfg = ClientConfig::load()?;
	parse_args(&mut cfg);

	let endpoint = cfg.endpoint().map_err(anyhow::Error::msg)?;
	let api = Arc::new(HttpDashboardApi::new(endpoint.http_base())?);
	info!(channel = %endpoint.ws_url(), api = %api.base_url(), "starting client");

	let (controller, mut ui_rx, shutdown) = start_client(cfg, api)?;
	controller.connect().await.map_err(anyhow::Error::msg)?;

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			ev = ui_rx.recv() => {
				let Some(ev) = ev else { break };
				print_event(&ev);
			}
			line = lines.next_line() => {
				match line {
					Ok(Some(line)) => match dispatch_line(&controller, line.trim()).await {
						Ok(true) => {}
						Ok(false) => break,
						Err(e) => {
							warn!(error = %e, "command failed");
							break;
						}
					},
					Ok(None) => break,
					Err(e) => {
						warn!(error = %e, "stdin closed");
						break;
					}
				}
			}
		}
	}

	let _ = controller.disconnect("client exit").await;
	tokio::task::spawn_blocking(move || shutdown.shutdown()).await?;
	Ok(())
}
