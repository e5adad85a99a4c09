//! Display Module
//!
//! The window manager's only route to the X server. Core code is written
//! against [`DisplayServer`]; [`X11Display`] implements it on an x11rb
//! connection and owns the per-screen drawing resources, the font, the
//! cursors and the cached keyboard mapping.

use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xinerama::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::shared::{Geometry, Point, Rect};
use crate::wm::ewmh::{Atoms, Prop};

/// `SetInputFocus` focus value meaning "whatever is under the pointer"
const POINTER_ROOT: Window = 1;

/// ICCCM WM_STATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

/// Cursor shown while the pointer is grabbed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCursor {
    Move,
    Resize,
}

/// How a shape request combines with the existing bounding shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOp {
    Set,
    Union,
}

/// Everything `manage` needs to know about a new top-level window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInfo {
    /// Position (logical-screen coordinates) and size of the client area
    pub geometry: Rect,
    pub border_width: i32,
    pub override_redirect: bool,
    /// Already viewable when first seen (startup scan)
    pub viewable: bool,
    /// Raw WM_NORMAL_HINTS cardinals, empty when unset
    pub normal_hints: Vec<u32>,
    pub is_dock: bool,
    /// `_NET_WM_DESKTOP`, when set
    pub desktop: Option<u32>,
}

/// Pixel metrics of a string in the annotation font
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextExtents {
    pub width: i32,
    pub ascent: i32,
    pub descent: i32,
}

/// Pointer position as reported by `QueryPointer`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerPosition {
    /// Root window the pointer is on
    pub root: Window,
    pub position: Point,
}

/// Requests the window manager core makes of the display server.
///
/// Request methods return `Err` only when the connection itself fails;
/// protocol errors on individual windows arrive later as error events.
pub trait DisplayServer {
    // Screens and outputs

    fn screen_roots(&self) -> Vec<(Window, i32, i32)>;
    fn border_pixel(&mut self, screen: usize, rgb: u32) -> Result<u32>;
    fn has_shape(&self) -> bool;
    /// RandR CRTC regions. An error means the backend is unavailable.
    fn query_crtcs(&mut self, root: Window) -> Result<Vec<Rect>>;
    /// Xinerama screen regions. An error means the backend is unavailable.
    fn query_xinerama(&mut self) -> Result<Vec<Rect>>;

    // Window lifecycle

    /// Children of `root`, bottom to top
    fn query_tree(&mut self, root: Window) -> Result<Vec<Window>>;
    fn inspect_window(&mut self, window: Window) -> Result<WindowInfo>;
    fn create_frame(&mut self, root: Window, rect: Rect, border_width: i32, pixel: u32) -> Result<Window>;
    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()>;
    fn set_save_set(&mut self, window: Window, insert: bool) -> Result<()>;
    fn select_client_input(&mut self, window: Window) -> Result<()>;
    fn destroy_window(&mut self, window: Window) -> Result<()>;
    /// Whether the client takes part in the WM_DELETE_WINDOW protocol
    fn supports_delete(&mut self, window: Window) -> Result<bool>;
    fn send_delete(&mut self, window: Window) -> Result<()>;
    fn kill_client(&mut self, window: Window) -> Result<()>;
    /// Give `frame` the bounding shape of `window` if it has one. Returns
    /// whether the window is shaped.
    fn copy_client_shape(&mut self, frame: Window, window: Window) -> Result<bool>;

    // Geometry and stacking

    fn map_window(&mut self, window: Window) -> Result<()>;
    fn unmap_window(&mut self, window: Window) -> Result<()>;
    fn move_resize_window(&mut self, window: Window, rect: Rect) -> Result<()>;
    fn set_border_width(&mut self, window: Window, border_width: i32) -> Result<()>;
    fn raise_window(&mut self, window: Window) -> Result<()>;
    fn stack_below(&mut self, window: Window, sibling: Window) -> Result<()>;
    fn stack_above(&mut self, window: Window, sibling: Window) -> Result<()>;
    /// Synthetic ConfigureNotify; `geometry` is in logical-screen coordinates
    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()>;
    /// Pass a ConfigureRequest for an unmanaged window straight through
    fn forward_configure_request(&mut self, request: &ConfigureRequestEvent) -> Result<()>;
    fn set_border_colour(&mut self, window: Window, pixel: u32) -> Result<()>;
    /// `None` returns focus to PointerRoot
    fn set_input_focus(&mut self, window: Option<Window>) -> Result<()>;

    // Properties

    fn set_wm_state(&mut self, window: Window, state: WmState) -> Result<()>;
    fn set_cardinals(&mut self, window: Window, prop: Prop, values: &[u32]) -> Result<()>;
    fn set_atom_list(&mut self, window: Window, prop: Prop, values: &[Prop]) -> Result<()>;
    fn set_window_list(&mut self, window: Window, prop: Prop, values: &[Window]) -> Result<()>;
    fn delete_property(&mut self, window: Window, prop: Prop) -> Result<()>;
    fn prop_for_atom(&self, atom: Atom) -> Option<Prop>;
    fn window_name(&mut self, window: Window) -> Result<Option<String>>;

    // Input

    fn grab_pointer(&mut self, root: Window, cursor: PointerCursor) -> Result<bool>;
    fn ungrab_pointer(&mut self) -> Result<()>;
    fn grab_keyboard(&mut self, root: Window) -> Result<bool>;
    fn ungrab_keyboard(&mut self) -> Result<()>;
    fn query_pointer(&mut self, root: Window) -> Result<PointerPosition>;
    fn warp_pointer(&mut self, window: Window, x: i32, y: i32) -> Result<()>;
    /// Drop queued EnterNotify events so a geometry change does not move focus
    fn discard_enter_events(&mut self) -> Result<()>;
    fn auto_repeat(&mut self) -> Result<bool>;
    fn set_auto_repeat(&mut self, enabled: bool) -> Result<()>;
    fn grab_server(&mut self) -> Result<()>;
    fn ungrab_server(&mut self) -> Result<()>;
    fn keysym_to_keycodes(&self, keysym: u32) -> Vec<u8>;
    fn keycode_to_keysym(&self, keycode: u8) -> u32;
    fn refresh_keyboard_mapping(&mut self) -> Result<()>;
    fn numlock_mask(&self) -> u16;
    fn grab_key(&mut self, root: Window, modifiers: u16, keycode: u8) -> Result<()>;
    fn ungrab_keys(&mut self, root: Window) -> Result<()>;
    fn grab_button(&mut self, window: Window, modifiers: u16, button: u8) -> Result<()>;

    // Annotation drawing

    fn text_extents(&mut self, text: &str) -> Result<TextExtents>;
    /// Inverting rectangle outline on the root of `screen`
    fn xor_rectangle(&mut self, screen: usize, rect: Rect) -> Result<()>;
    fn xor_line(&mut self, screen: usize, from: Point, to: Point) -> Result<()>;
    /// Inverting text on `drawable` (the root, or an annotation window)
    fn xor_text(&mut self, screen: usize, drawable: Window, x: i32, y: i32, text: &str) -> Result<()>;
    /// Mapped, raised, override-redirect window filled with `pixel`
    fn create_overlay(&mut self, root: Window, rect: Rect, pixel: u32) -> Result<Window>;
    fn set_shape(&mut self, window: Window, op: ShapeOp, offset: Point, rects: &[Rect]) -> Result<()>;
    fn clear_window(&mut self, window: Window) -> Result<()>;
}

/// X11 extensions the window manager uses
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    pub have_shape: bool,
    pub have_randr: bool,
    pub have_xinerama: bool,
    pub randr_event_base: u8,
}

impl Extensions {
    fn detect(conn: &RustConnection) -> Result<Self> {
        let mut ext = Self::default();

        // Going through the extension manager lets x11rb decode their events
        ext.have_shape = conn.extension_information(shape::X11_EXTENSION_NAME)?.is_some();
        if let Some(randr) = conn.extension_information(randr::X11_EXTENSION_NAME)? {
            ext.have_randr = true;
            ext.randr_event_base = randr.first_event;
        }
        ext.have_xinerama = conn
            .extension_information(xinerama::X11_EXTENSION_NAME)?
            .is_some();

        info!(
            "X11 Extensions: shape={}, randr={}, xinerama={}",
            ext.have_shape, ext.have_randr, ext.have_xinerama
        );
        Ok(ext)
    }
}

/// Cursors used during pointer grabs
#[derive(Debug)]
pub struct Cursors {
    pub move_cursor: Cursor,
    pub resize: Cursor,
}

impl Cursors {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;

        // Glyphs from the standard cursor font: fleur = 52, plus = 90
        let create_cursor = |glyph_id: u16| -> Result<Cursor> {
            let cursor_id = conn.generate_id()?;
            conn.create_glyph_cursor(
                cursor_id,
                font,
                font,
                glyph_id,
                glyph_id + 1,
                0,
                0,
                0,
                0xffff,
                0xffff,
                0xffff,
            )?;
            Ok(cursor_id)
        };

        let move_cursor = create_cursor(52)?;
        let resize = create_cursor(90)?;
        conn.close_font(font)?;

        Ok(Self { move_cursor, resize })
    }
}

/// Drawing resources held per screen
#[derive(Debug)]
struct ScreenResources {
    root: Window,
    width: i32,
    height: i32,
    colormap: Colormap,
    invert_gc: Gcontext,
    /// `_NET_SUPPORTING_WM_CHECK` window
    check_window: Window,
}

/// Keysym table from `GetKeyboardMapping`
#[derive(Debug, Default)]
struct KeyboardMapping {
    min_keycode: u8,
    keysyms_per_keycode: usize,
    keysyms: Vec<u32>,
}

impl KeyboardMapping {
    fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;
        let reply = conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()?;
        Ok(Self {
            min_keycode,
            keysyms_per_keycode: reply.keysyms_per_keycode as usize,
            keysyms: reply.keysyms,
        })
    }

    fn keycodes(&self, keysym: u32) -> Vec<u8> {
        if self.keysyms_per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym))
            .map(|(i, _)| self.min_keycode.wrapping_add(i as u8))
            .collect()
    }

    fn keysym(&self, keycode: u8) -> u32 {
        let index = keycode.wrapping_sub(self.min_keycode) as usize * self.keysyms_per_keycode;
        self.keysyms.get(index).copied().unwrap_or(0)
    }
}

/// X11 implementation of [`DisplayServer`]
pub struct X11Display {
    conn: Arc<RustConnection>,
    atoms: Atoms,
    extensions: Extensions,
    cursors: Cursors,
    screens: Vec<ScreenResources>,
    font: Font,
    font_ascent: i32,
    font_descent: i32,
    keyboard: KeyboardMapping,
    numlock_mask: u16,

    /// Events read while discarding enter events, handed back to the loop
    deferred: VecDeque<Event>,
}

impl X11Display {
    /// Take over every screen of the connection.
    ///
    /// Fails if another window manager already holds SubstructureRedirect.
    pub fn new(conn: Arc<RustConnection>, font_name: &str) -> Result<Self> {
        info!("Initializing X11 display");
        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;
        let extensions = Extensions::detect(conn.as_ref())?;
        let cursors = Cursors::new(conn.as_ref()).context("Failed to create cursors")?;

        let font = Self::open_font(conn.as_ref(), font_name)?;
        let font_info = conn.query_font(font)?.reply().context("Failed to query font")?;
        let font_ascent = font_info.max_bounds.ascent as i32;
        let font_descent = font_info.max_bounds.descent as i32;

        let mut screens = Vec::new();
        for (number, screen) in conn.setup().roots.iter().enumerate() {
            let root = screen.root;
            let mask = EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::ENTER_WINDOW
                | EventMask::COLOR_MAP_CHANGE
                | EventMask::PROPERTY_CHANGE;
            conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?
                .check()
                .with_context(|| format!("Root window of screen {} unavailable (maybe another wm is running?)", number))?;

            let invert_gc = conn.generate_id()?;
            conn.create_gc(
                invert_gc,
                root,
                &CreateGCAux::new()
                    .function(GX::INVERT)
                    .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS)
                    .line_width(1)
                    .font(font),
            )?;

            let check_window = conn.generate_id()?;
            conn.create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                check_window,
                root,
                -1,
                -1,
                1,
                1,
                0,
                WindowClass::INPUT_ONLY,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new().override_redirect(1),
            )?;
            atoms.setup_supported(conn.as_ref(), root, check_window)?;

            if extensions.have_randr {
                conn.randr_select_input(root, randr::NotifyMask::SCREEN_CHANGE)?;
            }

            debug!("Screen {}: root 0x{:x}, {}x{}", number, root, screen.width_in_pixels, screen.height_in_pixels);
            screens.push(ScreenResources {
                root,
                width: screen.width_in_pixels as i32,
                height: screen.height_in_pixels as i32,
                colormap: screen.default_colormap,
                invert_gc,
                check_window,
            });
        }

        let keyboard = KeyboardMapping::load(conn.as_ref()).context("Failed to read keyboard mapping")?;
        let mut display = Self {
            conn,
            atoms,
            extensions,
            cursors,
            screens,
            font,
            font_ascent,
            font_descent,
            keyboard,
            numlock_mask: 0,
            deferred: VecDeque::new(),
        };
        display.numlock_mask = display.find_numlock_mask()?;
        display.conn.flush()?;
        Ok(display)
    }

    fn open_font(conn: &RustConnection, name: &str) -> Result<Font> {
        let font = conn.generate_id()?;
        if conn.open_font(font, name.as_bytes())?.check().is_ok() {
            return Ok(font);
        }
        warn!("Font {:?} not found, falling back to \"fixed\"", name);
        let font = conn.generate_id()?;
        conn.open_font(font, b"fixed")?
            .check()
            .context("Failed to open fallback font")?;
        Ok(font)
    }

    /// Find which modifier bit Num_Lock is mapped to.
    fn find_numlock_mask(&self) -> Result<u16> {
        const XK_NUM_LOCK: u32 = 0xff7f;
        let numlock_codes = self.keyboard.keycodes(XK_NUM_LOCK);
        let reply = self.conn.get_modifier_mapping()?.reply()?;
        let per_modifier = reply.keycodes.len() / 8;
        if per_modifier == 0 {
            return Ok(0);
        }
        for (i, codes) in reply.keycodes.chunks(per_modifier).enumerate() {
            if codes.iter().any(|code| *code != 0 && numlock_codes.contains(code)) {
                debug!("Num_Lock is modifier {}", i);
                return Ok(1 << i);
            }
        }
        Ok(0)
    }

    pub fn randr_event_base(&self) -> Option<u8> {
        self.extensions.have_randr.then_some(self.extensions.randr_event_base)
    }

    /// Events read ahead while discarding enter events.
    pub fn take_deferred_events(&mut self) -> Vec<Event> {
        self.deferred.drain(..).collect()
    }

    /// Release server resources on shutdown.
    pub fn close(&mut self) -> Result<()> {
        for screen in &self.screens {
            self.conn.free_gc(screen.invert_gc)?;
            self.conn.destroy_window(screen.check_window)?;
        }
        self.conn.close_font(self.font)?;
        self.conn.free_cursor(self.cursors.move_cursor)?;
        self.conn.free_cursor(self.cursors.resize)?;
        self.conn.flush()?;
        Ok(())
    }

    fn gc(&self, screen: usize) -> Result<Gcontext> {
        self.screens
            .get(screen)
            .map(|s| s.invert_gc)
            .with_context(|| format!("No screen {}", screen))
    }

    fn read_cardinals(&self, window: Window, property: Atom, type_: impl Into<Atom>, length: u32) -> Result<Vec<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, length)?
            .reply()?;
        Ok(reply.value32().map(|v| v.collect()).unwrap_or_default())
    }
}

fn to_rectangle(rect: Rect) -> Rectangle {
    Rectangle {
        x: rect.x as i16,
        y: rect.y as i16,
        width: rect.width.max(1) as u16,
        height: rect.height.max(1) as u16,
    }
}

impl DisplayServer for X11Display {
    fn screen_roots(&self) -> Vec<(Window, i32, i32)> {
        self.screens.iter().map(|s| (s.root, s.width, s.height)).collect()
    }

    fn border_pixel(&mut self, screen: usize, rgb: u32) -> Result<u32> {
        let colormap = self
            .screens
            .get(screen)
            .map(|s| s.colormap)
            .with_context(|| format!("No screen {}", screen))?;
        let channel = |shift: u32| (((rgb >> shift) & 0xff) * 0x101) as u16;
        let reply = self
            .conn
            .alloc_color(colormap, channel(16), channel(8), channel(0))?
            .reply()
            .with_context(|| format!("Failed to allocate colour #{:06x}", rgb))?;
        Ok(reply.pixel)
    }

    fn has_shape(&self) -> bool {
        self.extensions.have_shape
    }

    fn query_crtcs(&mut self, root: Window) -> Result<Vec<Rect>> {
        if !self.extensions.have_randr {
            bail!("RandR not available");
        }
        let version = self.conn.randr_query_version(1, 3)?.reply()?;
        if version.major_version == 1 && version.minor_version < 2 {
            bail!("RandR {}.{} has no CRTC support", version.major_version, version.minor_version);
        }
        let resources = self.conn.randr_get_screen_resources_current(root)?.reply()?;
        let mut regions = Vec::with_capacity(resources.crtcs.len());
        for crtc in &resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(*crtc, resources.config_timestamp)?
                .reply()?;
            debug!(
                "discovered crtc 0x{:x}: {}x{}+{}+{}",
                crtc, info.width, info.height, info.x, info.y
            );
            regions.push(Rect::new(info.x as i32, info.y as i32, info.width as i32, info.height as i32));
        }
        Ok(regions)
    }

    fn query_xinerama(&mut self) -> Result<Vec<Rect>> {
        if !self.extensions.have_xinerama {
            bail!("Xinerama not available");
        }
        // Xinerama cannot describe more than one X screen
        if self.screens.len() > 1 {
            bail!("Xinerama present, but there are multiple screens");
        }
        if self.conn.xinerama_is_active()?.reply()?.state == 0 {
            bail!("Xinerama inactive");
        }
        let reply = self.conn.xinerama_query_screens()?.reply()?;
        Ok(reply
            .screen_info
            .iter()
            .map(|s| Rect::new(s.x_org as i32, s.y_org as i32, s.width as i32, s.height as i32))
            .collect())
    }

    fn query_tree(&mut self, root: Window) -> Result<Vec<Window>> {
        Ok(self.conn.query_tree(root)?.reply()?.children)
    }

    fn inspect_window(&mut self, window: Window) -> Result<WindowInfo> {
        let attributes = self.conn.get_window_attributes(window)?.reply()?;
        let geometry = self.conn.get_geometry(window)?.reply()?;
        let normal_hints = self.read_cardinals(window, AtomEnum::WM_NORMAL_HINTS.into(), AtomEnum::WM_SIZE_HINTS, 18)?;
        let dock = self.atoms.atom(Prop::NetWmWindowTypeDock);
        let is_dock = self.atoms.get_window_type(self.conn.as_ref(), window)?.contains(&dock);
        let desktop = self.atoms.get_cardinal(self.conn.as_ref(), window, Prop::NetWmDesktop)?;

        Ok(WindowInfo {
            geometry: Rect::new(
                geometry.x as i32,
                geometry.y as i32,
                geometry.width as i32,
                geometry.height as i32,
            ),
            border_width: geometry.border_width as i32,
            override_redirect: attributes.override_redirect,
            viewable: attributes.map_state == MapState::VIEWABLE,
            normal_hints,
            is_dock,
            desktop,
        })
    }

    fn create_frame(&mut self, root: Window, rect: Rect, border_width: i32, pixel: u32) -> Result<Window> {
        let frame = self.conn.generate_id()?;
        let r = to_rectangle(rect);
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            frame,
            root,
            r.x,
            r.y,
            r.width,
            r.height,
            border_width.max(0) as u16,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .border_pixel(pixel)
                .override_redirect(1)
                .event_mask(
                    EventMask::SUBSTRUCTURE_REDIRECT
                        | EventMask::SUBSTRUCTURE_NOTIFY
                        | EventMask::BUTTON_PRESS
                        | EventMask::ENTER_WINDOW,
                ),
        )?;
        Ok(frame)
    }

    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.conn.reparent_window(window, parent, x as i16, y as i16)?;
        Ok(())
    }

    fn set_save_set(&mut self, window: Window, insert: bool) -> Result<()> {
        let mode = if insert { SetMode::INSERT } else { SetMode::DELETE };
        self.conn.change_save_set(mode, window)?;
        Ok(())
    }

    fn select_client_input(&mut self, window: Window) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE | EventMask::COLOR_MAP_CHANGE),
        )?;
        if self.extensions.have_shape {
            self.conn.shape_select_input(window, true)?;
        }
        Ok(())
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn supports_delete(&mut self, window: Window) -> Result<bool> {
        self.atoms.supports_delete(self.conn.as_ref(), window)
    }

    fn send_delete(&mut self, window: Window) -> Result<()> {
        self.atoms.send_delete(self.conn.as_ref(), window)
    }

    fn kill_client(&mut self, window: Window) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn copy_client_shape(&mut self, frame: Window, window: Window) -> Result<bool> {
        if !self.extensions.have_shape {
            return Ok(false);
        }
        let extents = self.conn.shape_query_extents(window)?.reply()?;
        if extents.bounding_shaped {
            self.conn.shape_combine(
                shape::SO::SET,
                shape::SK::BOUNDING,
                shape::SK::BOUNDING,
                frame,
                0,
                0,
                window,
            )?;
        }
        Ok(extents.bounding_shaped)
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn move_resize_window(&mut self, window: Window, rect: Rect) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width.max(1) as u32)
                .height(rect.height.max(1) as u32),
        )?;
        Ok(())
    }

    fn set_border_width(&mut self, window: Window, border_width: i32) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().border_width(border_width.max(0) as u32),
        )?;
        Ok(())
    }

    fn raise_window(&mut self, window: Window) -> Result<()> {
        self.conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        Ok(())
    }

    fn stack_below(&mut self, window: Window, sibling: Window) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().sibling(sibling).stack_mode(StackMode::BELOW),
        )?;
        Ok(())
    }

    fn stack_above(&mut self, window: Window, sibling: Window) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().sibling(sibling).stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width.max(1) as u16,
            height: geometry.height.max(1) as u16,
            border_width: 0,
            override_redirect: false,
        };
        self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn forward_configure_request(&mut self, request: &ConfigureRequestEvent) -> Result<()> {
        let aux = ConfigureWindowAux::from_configure_request(request);
        self.conn.configure_window(request.window, &aux)?;
        Ok(())
    }

    fn set_border_colour(&mut self, window: Window, pixel: u32) -> Result<()> {
        self.conn.change_window_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(pixel))?;
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>) -> Result<()> {
        self.conn.set_input_focus(
            InputFocus::POINTER_ROOT,
            window.unwrap_or(POINTER_ROOT),
            x11rb::CURRENT_TIME,
        )?;
        Ok(())
    }

    fn set_wm_state(&mut self, window: Window, state: WmState) -> Result<()> {
        let wm_state = self.atoms.atom(Prop::WmState);
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            wm_state,
            wm_state,
            &[state as u32, x11rb::NONE],
        )?;
        Ok(())
    }

    fn set_cardinals(&mut self, window: Window, prop: Prop, values: &[u32]) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.atom(prop),
            AtomEnum::CARDINAL,
            values,
        )?;
        Ok(())
    }

    fn set_atom_list(&mut self, window: Window, prop: Prop, values: &[Prop]) -> Result<()> {
        let atoms: Vec<Atom> = values.iter().map(|&p| self.atoms.atom(p)).collect();
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.atom(prop),
            AtomEnum::ATOM,
            &atoms,
        )?;
        Ok(())
    }

    fn set_window_list(&mut self, window: Window, prop: Prop, values: &[Window]) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.atom(prop),
            AtomEnum::WINDOW,
            values,
        )?;
        Ok(())
    }

    fn delete_property(&mut self, window: Window, prop: Prop) -> Result<()> {
        self.conn.delete_property(window, self.atoms.atom(prop))?;
        Ok(())
    }

    fn prop_for_atom(&self, atom: Atom) -> Option<Prop> {
        self.atoms.prop(atom)
    }

    fn window_name(&mut self, window: Window) -> Result<Option<String>> {
        let utf8 = self
            .conn
            .get_property(false, window, self.atoms.atom(Prop::NetWmName), self.atoms.utf8_string, 0, 256)?
            .reply()?;
        if !utf8.value.is_empty() {
            return Ok(Some(String::from_utf8_lossy(&utf8.value).into_owned()));
        }
        let legacy = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::STRING, 0, 256)?
            .reply()?;
        if legacy.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&legacy.value).into_owned()))
    }

    fn grab_pointer(&mut self, root: Window, cursor: PointerCursor) -> Result<bool> {
        let cursor = match cursor {
            PointerCursor::Move => self.cursors.move_cursor,
            PointerCursor::Resize => self.cursors.resize,
        };
        let reply = self
            .conn
            .grab_pointer(
                false,
                root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                cursor,
                x11rb::CURRENT_TIME,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn grab_keyboard(&mut self, root: Window) -> Result<bool> {
        let reply = self
            .conn
            .grab_keyboard(false, root, x11rb::CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn query_pointer(&mut self, root: Window) -> Result<PointerPosition> {
        let reply = self.conn.query_pointer(root)?.reply()?;
        Ok(PointerPosition {
            root: reply.root,
            position: Point::new(reply.root_x as i32, reply.root_y as i32),
        })
    }

    fn warp_pointer(&mut self, window: Window, x: i32, y: i32) -> Result<()> {
        self.conn.warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, x as i16, y as i16)?;
        Ok(())
    }

    fn discard_enter_events(&mut self) -> Result<()> {
        // Round trip so every event caused by earlier requests is queued
        self.conn.get_input_focus()?.reply()?;
        while let Some(event) = self.conn.poll_for_event()? {
            if !matches!(event, Event::EnterNotify(_)) {
                self.deferred.push_back(event);
            }
        }
        Ok(())
    }

    fn auto_repeat(&mut self) -> Result<bool> {
        let reply = self.conn.get_keyboard_control()?.reply()?;
        Ok(u32::from(reply.global_auto_repeat) != 0)
    }

    fn set_auto_repeat(&mut self, enabled: bool) -> Result<()> {
        let mode = if enabled { AutoRepeatMode::ON } else { AutoRepeatMode::OFF };
        self.conn
            .change_keyboard_control(&ChangeKeyboardControlAux::new().auto_repeat_mode(mode))?;
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.conn.grab_server()?;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.conn.ungrab_server()?;
        self.conn.flush()?;
        Ok(())
    }

    fn keysym_to_keycodes(&self, keysym: u32) -> Vec<u8> {
        self.keyboard.keycodes(keysym)
    }

    fn keycode_to_keysym(&self, keycode: u8) -> u32 {
        self.keyboard.keysym(keycode)
    }

    fn refresh_keyboard_mapping(&mut self) -> Result<()> {
        self.keyboard = KeyboardMapping::load(self.conn.as_ref())?;
        self.numlock_mask = self.find_numlock_mask()?;
        Ok(())
    }

    fn numlock_mask(&self) -> u16 {
        self.numlock_mask
    }

    fn grab_key(&mut self, root: Window, modifiers: u16, keycode: u8) -> Result<()> {
        self.conn.grab_key(
            true,
            root,
            ModMask::from(modifiers),
            keycode,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )?;
        Ok(())
    }

    fn ungrab_keys(&mut self, root: Window) -> Result<()> {
        self.conn.ungrab_key(Grab::ANY, root, ModMask::ANY)?;
        Ok(())
    }

    fn grab_button(&mut self, window: Window, modifiers: u16, button: u8) -> Result<()> {
        self.conn.grab_button(
            false,
            window,
            EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
            x11rb::NONE,
            x11rb::NONE,
            ButtonIndex::from(button),
            ModMask::from(modifiers),
        )?;
        Ok(())
    }

    fn text_extents(&mut self, text: &str) -> Result<TextExtents> {
        let chars: Vec<Char2b> = text.bytes().map(|b| Char2b { byte1: 0, byte2: b }).collect();
        let reply = self.conn.query_text_extents(self.font, &chars)?.reply()?;
        Ok(TextExtents {
            width: reply.overall_width,
            ascent: self.font_ascent,
            descent: self.font_descent,
        })
    }

    fn xor_rectangle(&mut self, screen: usize, rect: Rect) -> Result<()> {
        let gc = self.gc(screen)?;
        let root = self.screens[screen].root;
        self.conn.poly_rectangle(root, gc, &[to_rectangle(rect)])?;
        Ok(())
    }

    fn xor_line(&mut self, screen: usize, from: Point, to: Point) -> Result<()> {
        let gc = self.gc(screen)?;
        let root = self.screens[screen].root;
        self.conn.poly_segment(
            root,
            gc,
            &[Segment {
                x1: from.x as i16,
                y1: from.y as i16,
                x2: to.x as i16,
                y2: to.y as i16,
            }],
        )?;
        Ok(())
    }

    fn xor_text(&mut self, screen: usize, drawable: Window, x: i32, y: i32, text: &str) -> Result<()> {
        let gc = self.gc(screen)?;
        // PolyText8 items: length, delta, then up to 254 bytes of text
        let mut items = Vec::with_capacity(text.len() + 2);
        for chunk in text.as_bytes().chunks(254) {
            items.push(chunk.len() as u8);
            items.push(0);
            items.extend_from_slice(chunk);
        }
        self.conn.poly_text8(drawable, gc, x as i16, y as i16, &items)?;
        Ok(())
    }

    fn create_overlay(&mut self, root: Window, rect: Rect, pixel: u32) -> Result<Window> {
        let window = self.conn.generate_id()?;
        let r = to_rectangle(rect);
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            root,
            r.x,
            r.y,
            r.width,
            r.height,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(pixel)
                .save_under(1)
                .override_redirect(1),
        )?;
        self.conn.map_window(window)?;
        self.conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        Ok(window)
    }

    fn set_shape(&mut self, window: Window, op: ShapeOp, offset: Point, rects: &[Rect]) -> Result<()> {
        let op = match op {
            ShapeOp::Set => shape::SO::SET,
            ShapeOp::Union => shape::SO::UNION,
        };
        let rectangles: Vec<Rectangle> = rects.iter().map(|&r| to_rectangle(r)).collect();
        self.conn.shape_rectangles(
            op,
            shape::SK::BOUNDING,
            ClipOrdering::UNSORTED,
            window,
            offset.x as i16,
            offset.y as i16,
            &rectangles,
        )?;
        Ok(())
    }

    fn clear_window(&mut self, window: Window) -> Result<()> {
        self.conn.clear_area(false, window, 0, 0, 0, 0)?;
        Ok(())
    }
}
