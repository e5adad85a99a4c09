//! Test Support
//!
//! A recording [`DisplayServer`] that keeps just enough server state
//! (window tree, geometry, mapping, properties, grabs) for the window
//! manager's tests to check what it asked for.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use x11rb::protocol::xproto::{Atom, ConfigureRequestEvent, Window};

use crate::config::Config;
use crate::shared::{Geometry, Point, Rect};
use crate::wm::client::ClientId;
use crate::wm::display::{
    DisplayServer, PointerCursor, PointerPosition, ShapeOp, TextExtents, WindowInfo, WmState,
};
use crate::wm::ewmh::Prop;
use crate::wm::WindowManager;

/// One inverting draw request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XorDraw {
    Rect(usize, Rect),
    Line(usize, Point, Point),
    Text(usize, Window, i32, i32, String),
}

/// Stored property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    Cardinals(Vec<u32>),
    Atoms(Vec<Prop>),
    Windows(Vec<Window>),
}

/// Base of the fake atom numbering
const ATOM_BASE: Atom = 1000;

#[derive(Debug, Default)]
pub struct FakeDisplay {
    pub roots: Vec<(Window, i32, i32)>,
    /// RandR answer; `None` means the extension is missing
    pub crtcs: Option<Vec<Rect>>,
    /// Xinerama answer; `None` means the extension is missing
    pub xinerama: Option<Vec<Rect>>,
    pub shape: bool,

    /// Windows `inspect_window` knows about
    pub windows: HashMap<Window, WindowInfo>,
    pub names: HashMap<Window, String>,
    /// Creation order, so `query_tree` answers bottom to top
    created: Vec<Window>,
    parents: HashMap<Window, Window>,
    geometry: HashMap<Window, Rect>,
    borders: HashMap<Window, i32>,
    border_colours: HashMap<Window, u32>,
    mapped: HashSet<Window>,
    stacking: Vec<Window>,
    props: HashMap<(Window, Prop), PropValue>,
    pub wm_state: HashMap<Window, WmState>,
    pub save_set: HashSet<Window>,
    pub destroyed: Vec<Window>,
    pub configure_notifies: Vec<(Window, Geometry)>,
    /// Windows whose ConfigureRequest was passed through
    pub forwarded: Vec<Window>,
    pub focus: Option<Window>,
    /// Make `reparent_window` fail
    pub fail_reparent: bool,

    pub pointer: Point,
    pub pointer_grabbed: bool,
    pub keyboard_grabbed: bool,
    /// Make every grab fail
    pub refuse_grabs: bool,
    pub auto_repeat: bool,
    pub server_grabs: i32,
    pub warps: Vec<(Window, i32, i32)>,
    pub enter_discards: usize,
    pub key_grabs: Vec<(Window, u16, u8)>,
    pub button_grabs: Vec<(Window, u16, u8)>,

    pub xor_log: Vec<XorDraw>,
    pub overlays: Vec<Window>,
    pub shapes: Vec<(Window, ShapeOp, Point, Vec<Rect>)>,
    /// Client windows with a bounding shape of their own
    pub shaped: HashSet<Window>,
    /// `(frame, window)` for each shape copied onto a frame
    pub shape_copies: Vec<(Window, Window)>,

    /// Windows listing WM_DELETE_WINDOW in WM_PROTOCOLS
    pub delete_protocol: HashSet<Window>,
    pub deletes: Vec<Window>,
    pub killed: Vec<Window>,

    requests: usize,
    next_id: Window,
}

impl FakeDisplay {
    /// Advance of every character of the fake font
    pub const CHAR_WIDTH: i32 = 6;
    pub const LINE_HEIGHT: i32 = 13;
    const DESCENT: i32 = 3;

    pub fn new(roots: Vec<(Window, i32, i32)>) -> Self {
        Self {
            roots,
            shape: true,
            auto_repeat: true,
            next_id: 0x100,
            ..Self::default()
        }
    }

    fn new_id(&mut self) -> Window {
        self.next_id += 1;
        self.next_id
    }

    fn request(&mut self) {
        self.requests += 1;
    }

    fn create(&mut self, parent: Window, rect: Rect, border: i32) -> Window {
        let window = self.new_id();
        self.created.push(window);
        self.parents.insert(window, parent);
        self.geometry.insert(window, rect);
        self.borders.insert(window, border);
        self.stacking.push(window);
        window
    }

    /// A client window as an application would create it.
    pub fn add_window(&mut self, root: Window, rect: Rect) -> Window {
        let window = self.create(root, rect, 0);
        self.windows.insert(
            window,
            WindowInfo {
                geometry: rect,
                ..WindowInfo::default()
            },
        );
        window
    }

    /// Fake atom for a property, as a client would send it.
    pub fn atom_for(&self, prop: Prop) -> Atom {
        let index = Prop::ALL.iter().position(|&p| p == prop).unwrap_or(0);
        ATOM_BASE + index as Atom
    }

    pub fn request_count(&self) -> usize {
        self.requests
    }

    pub fn is_mapped(&self, window: Window) -> bool {
        self.mapped.contains(&window)
    }

    pub fn geometry_of(&self, window: Window) -> Option<Rect> {
        self.geometry.get(&window).copied()
    }

    pub fn border_of(&self, window: Window) -> Option<i32> {
        self.borders.get(&window).copied()
    }

    pub fn border_colour_of(&self, window: Window) -> Option<u32> {
        self.border_colours.get(&window).copied()
    }

    pub fn parent_of(&self, window: Window) -> Option<Window> {
        self.parents.get(&window).copied()
    }

    /// Bottom to top
    pub fn stacking(&self) -> &[Window] {
        &self.stacking
    }

    pub fn cardinals(&self, window: Window, prop: Prop) -> Option<Vec<u32>> {
        match self.props.get(&(window, prop)) {
            Some(PropValue::Cardinals(values)) => Some(values.clone()),
            _ => None,
        }
    }

    pub fn atom_list(&self, window: Window, prop: Prop) -> Option<Vec<Prop>> {
        match self.props.get(&(window, prop)) {
            Some(PropValue::Atoms(values)) => Some(values.clone()),
            _ => None,
        }
    }

    pub fn windows_prop(&self, window: Window, prop: Prop) -> Option<Vec<Window>> {
        match self.props.get(&(window, prop)) {
            Some(PropValue::Windows(values)) => Some(values.clone()),
            _ => None,
        }
    }
}

impl DisplayServer for FakeDisplay {
    fn screen_roots(&self) -> Vec<(Window, i32, i32)> {
        self.roots.clone()
    }

    fn border_pixel(&mut self, _screen: usize, rgb: u32) -> Result<u32> {
        Ok(rgb)
    }

    fn has_shape(&self) -> bool {
        self.shape
    }

    fn query_crtcs(&mut self, _root: Window) -> Result<Vec<Rect>> {
        match &self.crtcs {
            Some(regions) => Ok(regions.clone()),
            None => bail!("RandR not available"),
        }
    }

    fn query_xinerama(&mut self) -> Result<Vec<Rect>> {
        match &self.xinerama {
            Some(regions) => Ok(regions.clone()),
            None => bail!("Xinerama not available"),
        }
    }

    fn query_tree(&mut self, root: Window) -> Result<Vec<Window>> {
        self.request();
        Ok(self
            .created
            .iter()
            .copied()
            .filter(|w| self.parents.get(w) == Some(&root))
            .collect())
    }

    fn inspect_window(&mut self, window: Window) -> Result<WindowInfo> {
        self.request();
        match self.windows.get(&window) {
            Some(info) => Ok(info.clone()),
            None => bail!("BadWindow 0x{:x}", window),
        }
    }

    fn create_frame(&mut self, root: Window, rect: Rect, border_width: i32, pixel: u32) -> Result<Window> {
        self.request();
        let frame = self.create(root, rect, border_width);
        self.border_colours.insert(frame, pixel);
        Ok(frame)
    }

    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.request();
        if self.fail_reparent {
            bail!("reparent of 0x{:x} refused", window);
        }
        self.parents.insert(window, parent);
        let rect = self.geometry.entry(window).or_default();
        rect.x = x;
        rect.y = y;
        Ok(())
    }

    fn set_save_set(&mut self, window: Window, insert: bool) -> Result<()> {
        self.request();
        if insert {
            self.save_set.insert(window);
        } else {
            self.save_set.remove(&window);
        }
        Ok(())
    }

    fn select_client_input(&mut self, _window: Window) -> Result<()> {
        self.request();
        Ok(())
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.request();
        self.destroyed.push(window);
        self.mapped.remove(&window);
        self.stacking.retain(|&w| w != window);
        self.parents.remove(&window);
        Ok(())
    }

    fn supports_delete(&mut self, window: Window) -> Result<bool> {
        self.request();
        Ok(self.delete_protocol.contains(&window))
    }

    fn send_delete(&mut self, window: Window) -> Result<()> {
        self.request();
        self.deletes.push(window);
        Ok(())
    }

    fn kill_client(&mut self, window: Window) -> Result<()> {
        self.request();
        self.killed.push(window);
        Ok(())
    }

    fn copy_client_shape(&mut self, frame: Window, window: Window) -> Result<bool> {
        self.request();
        if !self.shape || !self.shaped.contains(&window) {
            return Ok(false);
        }
        self.shape_copies.push((frame, window));
        Ok(true)
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.request();
        self.mapped.insert(window);
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.request();
        self.mapped.remove(&window);
        Ok(())
    }

    fn move_resize_window(&mut self, window: Window, rect: Rect) -> Result<()> {
        self.request();
        self.geometry.insert(window, rect);
        Ok(())
    }

    fn set_border_width(&mut self, window: Window, border_width: i32) -> Result<()> {
        self.request();
        self.borders.insert(window, border_width);
        Ok(())
    }

    fn raise_window(&mut self, window: Window) -> Result<()> {
        self.request();
        self.stacking.retain(|&w| w != window);
        self.stacking.push(window);
        Ok(())
    }

    fn stack_below(&mut self, window: Window, sibling: Window) -> Result<()> {
        self.request();
        self.stacking.retain(|&w| w != window);
        let pos = self.stacking.iter().position(|&w| w == sibling).unwrap_or(0);
        self.stacking.insert(pos, window);
        Ok(())
    }

    fn stack_above(&mut self, window: Window, sibling: Window) -> Result<()> {
        self.request();
        self.stacking.retain(|&w| w != window);
        let pos = self
            .stacking
            .iter()
            .position(|&w| w == sibling)
            .map_or(self.stacking.len(), |p| p + 1);
        self.stacking.insert(pos, window);
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        self.request();
        self.configure_notifies.push((window, geometry));
        Ok(())
    }

    fn forward_configure_request(&mut self, request: &ConfigureRequestEvent) -> Result<()> {
        self.request();
        self.forwarded.push(request.window);
        Ok(())
    }

    fn set_border_colour(&mut self, window: Window, pixel: u32) -> Result<()> {
        self.request();
        self.border_colours.insert(window, pixel);
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>) -> Result<()> {
        self.request();
        self.focus = window;
        Ok(())
    }

    fn set_wm_state(&mut self, window: Window, state: WmState) -> Result<()> {
        self.request();
        self.wm_state.insert(window, state);
        Ok(())
    }

    fn set_cardinals(&mut self, window: Window, prop: Prop, values: &[u32]) -> Result<()> {
        self.request();
        self.props
            .insert((window, prop), PropValue::Cardinals(values.to_vec()));
        Ok(())
    }

    fn set_atom_list(&mut self, window: Window, prop: Prop, values: &[Prop]) -> Result<()> {
        self.request();
        self.props
            .insert((window, prop), PropValue::Atoms(values.to_vec()));
        Ok(())
    }

    fn set_window_list(&mut self, window: Window, prop: Prop, values: &[Window]) -> Result<()> {
        self.request();
        self.props
            .insert((window, prop), PropValue::Windows(values.to_vec()));
        Ok(())
    }

    fn delete_property(&mut self, window: Window, prop: Prop) -> Result<()> {
        self.request();
        self.props.remove(&(window, prop));
        Ok(())
    }

    fn prop_for_atom(&self, atom: Atom) -> Option<Prop> {
        let index = atom.checked_sub(ATOM_BASE)? as usize;
        Prop::ALL.get(index).copied()
    }

    fn window_name(&mut self, window: Window) -> Result<Option<String>> {
        self.request();
        Ok(self.names.get(&window).cloned())
    }

    fn grab_pointer(&mut self, _root: Window, _cursor: PointerCursor) -> Result<bool> {
        self.request();
        if self.refuse_grabs {
            return Ok(false);
        }
        self.pointer_grabbed = true;
        Ok(true)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.request();
        self.pointer_grabbed = false;
        Ok(())
    }

    fn grab_keyboard(&mut self, _root: Window) -> Result<bool> {
        self.request();
        if self.refuse_grabs {
            return Ok(false);
        }
        self.keyboard_grabbed = true;
        Ok(true)
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.request();
        self.keyboard_grabbed = false;
        Ok(())
    }

    fn query_pointer(&mut self, _root: Window) -> Result<PointerPosition> {
        self.request();
        let root = self.roots.first().map_or(x11rb::NONE, |r| r.0);
        Ok(PointerPosition {
            root,
            position: self.pointer,
        })
    }

    fn warp_pointer(&mut self, window: Window, x: i32, y: i32) -> Result<()> {
        self.request();
        self.warps.push((window, x, y));
        Ok(())
    }

    fn discard_enter_events(&mut self) -> Result<()> {
        self.request();
        self.enter_discards += 1;
        Ok(())
    }

    fn auto_repeat(&mut self) -> Result<bool> {
        self.request();
        Ok(self.auto_repeat)
    }

    fn set_auto_repeat(&mut self, enabled: bool) -> Result<()> {
        self.request();
        self.auto_repeat = enabled;
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.request();
        self.server_grabs += 1;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.request();
        self.server_grabs -= 1;
        Ok(())
    }

    fn keysym_to_keycodes(&self, keysym: u32) -> Vec<u8> {
        vec![(keysym & 0xff) as u8]
    }

    fn keycode_to_keysym(&self, keycode: u8) -> u32 {
        keycode as u32
    }

    fn refresh_keyboard_mapping(&mut self) -> Result<()> {
        self.request();
        Ok(())
    }

    fn numlock_mask(&self) -> u16 {
        0
    }

    fn grab_key(&mut self, root: Window, modifiers: u16, keycode: u8) -> Result<()> {
        self.request();
        self.key_grabs.push((root, modifiers, keycode));
        Ok(())
    }

    fn ungrab_keys(&mut self, root: Window) -> Result<()> {
        self.request();
        self.key_grabs.retain(|g| g.0 != root);
        Ok(())
    }

    fn grab_button(&mut self, window: Window, modifiers: u16, button: u8) -> Result<()> {
        self.request();
        self.button_grabs.push((window, modifiers, button));
        Ok(())
    }

    fn text_extents(&mut self, text: &str) -> Result<TextExtents> {
        Ok(TextExtents {
            width: Self::CHAR_WIDTH * text.len() as i32,
            ascent: Self::LINE_HEIGHT - Self::DESCENT,
            descent: Self::DESCENT,
        })
    }

    fn xor_rectangle(&mut self, screen: usize, rect: Rect) -> Result<()> {
        self.request();
        self.xor_log.push(XorDraw::Rect(screen, rect));
        Ok(())
    }

    fn xor_line(&mut self, screen: usize, from: Point, to: Point) -> Result<()> {
        self.request();
        self.xor_log.push(XorDraw::Line(screen, from, to));
        Ok(())
    }

    fn xor_text(&mut self, screen: usize, drawable: Window, x: i32, y: i32, text: &str) -> Result<()> {
        self.request();
        self.xor_log
            .push(XorDraw::Text(screen, drawable, x, y, text.to_string()));
        Ok(())
    }

    fn create_overlay(&mut self, root: Window, rect: Rect, _pixel: u32) -> Result<Window> {
        self.request();
        let window = self.create(root, rect, 0);
        self.mapped.insert(window);
        self.overlays.push(window);
        Ok(window)
    }

    fn set_shape(&mut self, window: Window, op: ShapeOp, offset: Point, rects: &[Rect]) -> Result<()> {
        self.request();
        self.shapes.push((window, op, offset, rects.to_vec()));
        Ok(())
    }

    fn clear_window(&mut self, _window: Window) -> Result<()> {
        self.request();
        Ok(())
    }
}

/// A window manager over a fake display with one root spanning `outputs`.
pub struct TestWm {
    pub wm: WindowManager<FakeDisplay>,
    pub root: Window,
}

impl TestWm {
    pub const ROOT: Window = 1;

    pub fn new(outputs: Vec<Rect>) -> Self {
        Self::with_config(outputs, Config::default())
    }

    pub fn with_config(outputs: Vec<Rect>, config: Config) -> Self {
        let width = outputs.iter().map(|r| r.x + r.width).max().unwrap_or(0);
        let height = outputs.iter().map(|r| r.y + r.height).max().unwrap_or(0);
        let mut display = FakeDisplay::new(vec![(Self::ROOT, width, height)]);
        display.crtcs = Some(outputs);
        let wm = WindowManager::new(display, config).unwrap();
        Self { wm, root: Self::ROOT }
    }

    pub fn create_window(&mut self, rect: Rect) -> Window {
        self.wm.display.add_window(self.root, rect)
    }

    pub fn manage(&mut self, rect: Rect) -> ClientId {
        let window = self.create_window(rect);
        self.wm.manage(self.root, window).unwrap().unwrap()
    }

    pub fn manage_dock(&mut self, rect: Rect) -> ClientId {
        let window = self.create_window(rect);
        if let Some(info) = self.wm.display.windows.get_mut(&window) {
            info.is_dock = true;
        }
        self.wm.manage(self.root, window).unwrap().unwrap()
    }
}
