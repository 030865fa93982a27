//! Checkerboard demo client
//!
//! Connects to a Wayland compositor, allocates an anonymous shared-memory
//! buffer through waybuf, fills it with the checkerboard pattern, and
//! displays it as an xdg_toplevel window.
//!
//! Run with: cargo run --example checkerboard

use std::os::fd::AsFd;

use log::{debug, info};
use waybuf::{pattern, PixelFormat, SharedBuffer};
use wayland_client::{
    protocol::{wl_buffer, wl_compositor, wl_registry, wl_shm, wl_shm_pool, wl_surface},
    Connection, Dispatch, EventQueue, QueueHandle,
};
use wayland_protocols::xdg::shell::client::{xdg_surface, xdg_toplevel, xdg_wm_base};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let conn = Connection::connect_to_env()?;
    info!("Connected to Wayland compositor");

    let mut event_queue: EventQueue<App> = conn.new_event_queue();
    let qh = event_queue.handle();

    let display = conn.display();
    display.get_registry(&qh, ());

    let mut app = App::new();

    // Roundtrip to collect globals
    event_queue.roundtrip(&mut app)?;

    let compositor = app
        .compositor
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no wl_compositor available"))?;
    let wm_base = app
        .wm_base
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no xdg_wm_base available"))?;
    let shm = app
        .shm
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no wl_shm available"))?;

    let surface = compositor.create_surface(&qh, ());
    let xdg_surface = wm_base.get_xdg_surface(&surface, &qh, ());
    let toplevel = xdg_surface.get_toplevel(&qh, ());
    toplevel.set_title("waybuf checkerboard".to_string());
    toplevel.set_app_id("waybuf.demo.checkerboard".to_string());
    surface.commit();

    info!("Waiting for configure...");
    while !app.configured {
        event_queue.blocking_dispatch(&mut app)?;
    }

    // Allocate the shared store and draw into it before the compositor
    // ever sees the descriptor.
    let mut buffer = SharedBuffer::new(WIDTH, HEIGHT, PixelFormat::Xrgb8888)?;
    let mut region = buffer.map_mut()?;
    pattern::fill_checkerboard(&mut region, WIDTH, HEIGHT, buffer.stride(), 0);
    drop(region);

    let handoff = buffer.handoff();
    let pool = shm.create_pool(buffer.as_fd(), handoff.size_bytes as i32, &qh, ());
    let wl_buffer = pool.create_buffer(
        0,
        handoff.width as i32,
        handoff.height as i32,
        handoff.stride as i32,
        wl_shm::Format::Xrgb8888,
        &qh,
        (),
    );
    pool.destroy();
    buffer.mark_in_use();
    app.buffer = Some(buffer);

    surface.attach(Some(&wl_buffer), 0, 0);
    surface.damage_buffer(0, 0, WIDTH as i32, HEIGHT as i32);
    surface.commit();
    info!("Buffer committed, running event loop (Ctrl+C to exit)");

    while app.running {
        event_queue.blocking_dispatch(&mut app)?;
    }

    Ok(())
}

struct App {
    compositor: Option<wl_compositor::WlCompositor>,
    shm: Option<wl_shm::WlShm>,
    wm_base: Option<xdg_wm_base::XdgWmBase>,
    buffer: Option<SharedBuffer>,
    configured: bool,
    running: bool,
}

impl App {
    fn new() -> Self {
        Self {
            compositor: None,
            shm: None,
            wm_base: None,
            buffer: None,
            configured: false,
            running: true,
        }
    }
}

impl Dispatch<wl_registry::WlRegistry, ()> for App {
    fn event(
        app: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            debug!("global: {} v{}", interface, version);
            match interface.as_str() {
                "wl_compositor" => {
                    app.compositor = Some(registry.bind::<wl_compositor::WlCompositor, _, _>(
                        name,
                        version.min(6),
                        qh,
                        (),
                    ));
                }
                "wl_shm" => {
                    app.shm =
                        Some(registry.bind::<wl_shm::WlShm, _, _>(name, version.min(1), qh, ()));
                }
                "xdg_wm_base" => {
                    app.wm_base = Some(registry.bind::<xdg_wm_base::XdgWmBase, _, _>(
                        name,
                        version.min(6),
                        qh,
                        (),
                    ));
                }
                _ => {}
            }
        }
    }
}

impl Dispatch<wl_compositor::WlCompositor, ()> for App {
    fn event(
        _app: &mut Self,
        _proxy: &wl_compositor::WlCompositor,
        _event: wl_compositor::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_surface::WlSurface, ()> for App {
    fn event(
        _app: &mut Self,
        _proxy: &wl_surface::WlSurface,
        _event: wl_surface::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_shm::WlShm, ()> for App {
    fn event(
        _app: &mut Self,
        _proxy: &wl_shm::WlShm,
        event: wl_shm::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format { format } = event {
            debug!("shm format: {:?}", format);
        }
    }
}

impl Dispatch<wl_shm_pool::WlShmPool, ()> for App {
    fn event(
        _app: &mut Self,
        _proxy: &wl_shm_pool::WlShmPool,
        _event: wl_shm_pool::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_buffer::WlBuffer, ()> for App {
    fn event(
        app: &mut Self,
        _proxy: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            // The compositor is done reading; the store may be redrawn.
            if let Some(buffer) = &mut app.buffer {
                buffer.mark_released();
            }
            debug!("buffer released");
        }
    }
}

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for App {
    fn event(
        _app: &mut Self,
        proxy: &xdg_wm_base::XdgWmBase,
        event: xdg_wm_base::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            proxy.pong(serial);
        }
    }
}

impl Dispatch<xdg_surface::XdgSurface, ()> for App {
    fn event(
        app: &mut Self,
        proxy: &xdg_surface::XdgSurface,
        event: xdg_surface::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            proxy.ack_configure(serial);
            app.configured = true;
        }
    }
}

impl Dispatch<xdg_toplevel::XdgToplevel, ()> for App {
    fn event(
        app: &mut Self,
        _proxy: &xdg_toplevel::XdgToplevel,
        event: xdg_toplevel::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                debug!("toplevel configure: {}x{}", width, height);
            }
            xdg_toplevel::Event::Close => {
                info!("Close requested");
                app.running = false;
            }
            _ => {}
        }
    }
}
