//! menu-runner: headless driver for the menu toolkit's reference host.
//!
//! Usage:
//!   menu-runner --ticks 100
//!   menu-runner --config menukit.json --ipc-mode
//!
//! In IPC mode every stdin line is one JSON command and every reply is one
//! JSON line on stdout.

use anyhow::{anyhow, Result};
use menukit_core::{
    config::ToolkitConfig,
    event::{Cancellable, ClickKind},
    item::Item,
    menu::MenuHandle,
    server::Server,
    surface::SurfaceLayout,
    toolkit::Toolkit,
    types::{SurfaceId, Tick, ViewerId},
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

const COUNTER_SLOT: usize = 11;
const TOGGLE_SLOT: usize = 13;
const RESET_SLOT: usize = 15;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Join {
        name: String,
    },
    OpenDemo {
        name: String,
    },
    Click {
        name: String,
        raw_slot: Option<usize>,
        #[serde(default = "default_click")]
        kind: ClickKind,
    },
    Close {
        name: String,
    },
    Tick {
        count: u64,
    },
    GetState,
    Quit,
}

fn default_click() -> ClickKind {
    ClickKind::Left
}

#[derive(serde::Serialize)]
struct ViewerSnapshot {
    id:          ViewerId,
    name:        String,
    open:        Option<SurfaceId>,
    cursor:      Option<Item>,
}

#[derive(serde::Serialize)]
struct UiState {
    tick:          Tick,
    pending_tasks: usize,
    menus:         usize,
    counter:       u64,
    demo_surface:  SurfaceId,
    demo_contents: Vec<Option<Item>>,
    viewers:       Vec<ViewerSnapshot>,
    last_click:    Option<ClickOutcome>,
}

#[derive(serde::Serialize, Clone)]
struct ClickOutcome {
    viewer:    String,
    raw_slot:  Option<usize>,
    cancelled: bool,
}

struct Runner {
    server:     Server,
    toolkit:    Toolkit,
    demo:       MenuHandle,
    counter:    Arc<AtomicU64>,
    viewers:    BTreeMap<String, ViewerId>,
    last_click: Option<ClickOutcome>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ticks = parse_arg(&args, "--ticks", 100u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let config = match args.windows(2).find(|w| w[0] == "--config") {
        Some(w) => ToolkitConfig::load(&w[1])?,
        None => ToolkitConfig::default(),
    };

    if !ipc_mode {
        println!("menu-runner");
        println!("  owner:       {}", config.owner);
        println!("  ticks:       {ticks}");
        println!("  click delay: {}", config.router.click_delay_ticks);
        println!();
    }

    let mut runner = Runner::build(config)?;

    if ipc_mode {
        run_ipc_loop(&mut runner)?;
    } else {
        run_scripted(&mut runner, ticks)?;
    }

    let report = runner.toolkit.shutdown();
    let leftover = runner.server.shutdown();
    log::info!("runner finished: {report:?}, {leftover} host tasks dropped");
    Ok(())
}

impl Runner {
    fn build(config: ToolkitConfig) -> Result<Self> {
        let server = Server::new(&config)?;
        let toolkit = Toolkit::init(config, server.host_executor(), server.bus())?;
        let counter = Arc::new(AtomicU64::new(0));
        let demo = build_demo_menu(&toolkit, Arc::clone(&counter))?;
        Ok(Self { server, toolkit, demo, counter, viewers: BTreeMap::new(), last_click: None })
    }

    fn viewer(&self, name: &str) -> Result<ViewerId> {
        self.viewers
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("no viewer named '{name}'"))
    }

    fn join(&mut self, name: &str) -> Result<ViewerId> {
        if let Some(id) = self.viewers.get(name) {
            return Ok(*id);
        }
        let id = self.server.join(name)?;
        self.viewers.insert(name.to_string(), id);
        Ok(id)
    }

    fn click(&mut self, name: &str, raw_slot: Option<usize>, kind: ClickKind) -> Result<()> {
        let viewer = self.viewer(name)?;
        let event = self.server.click(viewer, raw_slot, kind)?;
        self.last_click = Some(ClickOutcome {
            viewer: name.to_string(),
            raw_slot,
            cancelled: event.is_cancelled(),
        });
        Ok(())
    }

    fn state(&self) -> UiState {
        let viewers = self
            .viewers
            .iter()
            .filter_map(|(name, id)| {
                let state = self.server.viewer(*id)?;
                let open = self.server.view_of(*id).ok().filter(|_| state.open.is_some()).map(|v| v.top);
                Some(ViewerSnapshot {
                    id: *id,
                    name: name.clone(),
                    open,
                    cursor: state.cursor.clone(),
                })
            })
            .collect();
        let demo = self.demo.lock();
        UiState {
            tick: self.server.current_tick(),
            pending_tasks: self.server.executor().pending_count(),
            menus: self.toolkit.registry().len(),
            counter: self.counter.load(Ordering::SeqCst),
            demo_surface: demo.surface_id(),
            demo_contents: demo.contents(),
            viewers,
            last_click: self.last_click.clone(),
        }
    }
}

/// A bordered three-row menu: a counter, a sound toggle that re-renders
/// itself, and a reset button.
fn build_demo_menu(toolkit: &Toolkit, counter: Arc<AtomicU64>) -> Result<MenuHandle> {
    let handle = toolkit.menu("Demo", SurfaceLayout::Rows(3), move |menu| {
        menu.set_border(Item::new("GRAY_STAINED_GLASS_PANE").named(" "));

        let clicks = Arc::clone(&counter);
        menu.button(COUNTER_SLOT, Item::new("EMERALD").named("Clicks: 0"), move |event, menu| {
            let n = clicks.fetch_add(1, Ordering::SeqCst) + 1;
            menu.set_item(event.slot, Item::new("EMERALD").named(format!("Clicks: {n}")))?;
            Ok(())
        })?;

        menu.toggleable_button(
            TOGGLE_SLOT,
            Item::new("NOTE_BLOCK").named("Sound: on"),
            Item::new("BARRIER").named("Sound: off"),
            true,
            |state, event, menu| {
                let visual = if state {
                    Item::new("NOTE_BLOCK").named("Sound: on")
                } else {
                    Item::new("BARRIER").named("Sound: off")
                };
                menu.set_item(event.slot, visual)?;
                log::debug!("{} turned sound {}", event.viewer, if state { "on" } else { "off" });
                Ok(())
            },
        )?;

        let reset = Arc::clone(&counter);
        menu.button(RESET_SLOT, Item::new("LAVA_BUCKET").named("Reset"), move |_, menu| {
            reset.store(0, Ordering::SeqCst);
            menu.set_item(COUNTER_SLOT, Item::new("EMERALD").named("Clicks: 0"))?;
            Ok(())
        })?;

        menu.on_close(|_, event| {
            log::info!("{} left the demo menu", event.viewer);
            Ok(())
        });
        Ok(())
    })?;
    Ok(handle)
}

/// Non-interactive run: one viewer presses the counter every second.
fn run_scripted(runner: &mut Runner, ticks: u64) -> Result<()> {
    let viewer = runner.join("demo")?;
    runner.demo.open(&mut runner.server, viewer)?;

    let mut ran = 0;
    let mut failed = 0;
    for _ in 0..ticks {
        if runner.server.current_tick() % 20 == 0 {
            runner.click("demo", Some(COUNTER_SLOT), ClickKind::Left)?;
        }
        let report = runner.server.tick();
        ran += report.ran;
        failed += report.failed;
    }
    runner.server.close_view(viewer)?;

    let state = runner.state();
    println!("=== RUN SUMMARY ===");
    println!("  final tick:    {}", state.tick);
    println!("  tasks run:     {ran}");
    println!("  tasks failed:  {failed}");
    println!("  counter:       {}", state.counter);
    println!("  menus:         {}", state.menus);
    Ok(())
}

fn run_ipc_loop(runner: &mut Runner) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                reply_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(runner, cmd) {
            Ok(()) => writeln!(stdout, "{}", serde_json::to_string(&runner.state())?)?,
            Err(e) => reply_error(&mut stdout, &format!("{e:#}"))?,
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(runner: &mut Runner, cmd: IpcCommand) -> Result<()> {
    match cmd {
        IpcCommand::Join { name } => {
            runner.join(&name)?;
        }
        IpcCommand::OpenDemo { name } => {
            let viewer = runner.viewer(&name)?;
            if !runner.demo.open(&mut runner.server, viewer)? {
                log::warn!("demo menu open for {name} was cancelled");
            }
        }
        IpcCommand::Click { name, raw_slot, kind } => runner.click(&name, raw_slot, kind)?,
        IpcCommand::Close { name } => {
            let viewer = runner.viewer(&name)?;
            runner.server.close_view(viewer)?;
        }
        IpcCommand::Tick { count } => {
            runner.server.run_ticks(count);
        }
        IpcCommand::GetState | IpcCommand::Quit => {}
    }
    Ok(())
}

fn reply_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
