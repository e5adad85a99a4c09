//! Annotations Module
//!
//! Live feedback while the user drags, sweeps or asks for info on a client.
//!
//! Each [`Strategy`] is a table of optional lifecycle functions. A
//! [`Context`] holds up to three strategies (outline, info, cog slots) and
//! runs a lifecycle phase on each slot in that order, skipping slots that
//! are empty or leave the phase unset. Strategies drawing with an inverting
//! GC erase themselves by drawing again, so they hook `preupdate`; opaque
//! overlay windows just move and leave it unset.

use anyhow::Result;
use thiserror::Error;
use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::config::{AnnotationSlots, AnnotationsConfig};
use crate::shared::{Geometry, Point, Rect};
use crate::wm::client::ClientId;
use crate::wm::display::{DisplayServer, ShapeOp};
use crate::wm::hints::SizeHints;
use crate::wm::WindowManager;

/// Gap between xor info text and the client's bottom-right corner
const TEXT_SPACE: i32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown annotation strategy {0:?}")]
pub struct UnknownStrategy(pub String);

/// Built-in annotation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Inverted rectangle drawn on the root
    XorOutline,
    /// Override-redirect window shaped into a one pixel frame
    ShapeOutline,
    /// Inverted size/position text drawn on the root
    XorInfo,
    /// Small window holding the client name and size/position text
    InfoBanner,
    /// Inverted crosshair at the centre of gravity
    XorCog,
    /// Shape outline with a crosshair added to its shape
    ShapeCog,
}

impl Strategy {
    /// Look up a strategy by configuration name. `"none"` gives `None`.
    ///
    /// The underscored names used by older configurations are accepted too.
    pub fn from_name(name: &str) -> Result<Option<Self>, UnknownStrategy> {
        match name {
            "none" | "" => Ok(None),
            "xor-outline" | "xor_outline" => Ok(Some(Strategy::XorOutline)),
            "shape-outline" | "shape_outline" => Ok(Some(Strategy::ShapeOutline)),
            "xor-info" | "xor_info" => Ok(Some(Strategy::XorInfo)),
            "banner" | "x11_infobanner" => Ok(Some(Strategy::InfoBanner)),
            "xor-cog" | "xor_cog" => Ok(Some(Strategy::XorCog)),
            "shape-cog" | "shape_cog" => Ok(Some(Strategy::ShapeCog)),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }

    /// Shaped strategies fall back to their xor equivalents without SHAPE.
    pub fn resolve(self, has_shape: bool) -> Self {
        match self {
            Strategy::ShapeOutline if !has_shape => Strategy::XorOutline,
            Strategy::ShapeCog if !has_shape => Strategy::XorCog,
            other => other,
        }
    }

    pub fn funcs<D: DisplayServer>(self) -> AnnotateFuncs<D> {
        match self {
            Strategy::XorOutline => AnnotateFuncs {
                create: Some(xor_outline_create),
                preupdate: Some(xor_outline_remove),
                update: Some(xor_outline_create),
                remove: Some(xor_outline_remove),
            },
            Strategy::XorInfo => AnnotateFuncs {
                create: Some(xor_info_create),
                preupdate: Some(xor_info_remove),
                update: Some(xor_info_create),
                remove: Some(xor_info_remove),
            },
            Strategy::XorCog => AnnotateFuncs {
                create: Some(xor_cog_create),
                preupdate: Some(xor_cog_remove),
                update: Some(xor_cog_create),
                remove: Some(xor_cog_remove),
            },
            Strategy::InfoBanner => AnnotateFuncs {
                create: Some(banner_create),
                preupdate: None,
                update: Some(banner_update),
                remove: Some(banner_remove),
            },
            Strategy::ShapeOutline => AnnotateFuncs {
                create: Some(shape_outline_create),
                preupdate: None,
                update: Some(shape_outline_update),
                remove: Some(shape_outline_remove),
            },
            Strategy::ShapeCog => AnnotateFuncs {
                create: Some(shape_cog_create),
                preupdate: None,
                update: Some(shape_cog_update),
                remove: Some(shape_outline_remove),
            },
        }
    }
}

pub type AnnotateFn<D> = fn(&mut AnnotationState, &mut D, &AnnotationTarget) -> Result<()>;

/// Lifecycle functions of one strategy
pub struct AnnotateFuncs<D> {
    pub create: Option<AnnotateFn<D>>,
    pub preupdate: Option<AnnotateFn<D>>,
    pub update: Option<AnnotateFn<D>>,
    pub remove: Option<AnnotateFn<D>>,
}

impl<D> AnnotateFuncs<D> {
    fn get(&self, phase: Phase) -> Option<AnnotateFn<D>> {
        match phase {
            Phase::Create => self.create,
            Phase::Preupdate => self.preupdate,
            Phase::Update => self.update,
            Phase::Remove => self.remove,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    /// Before the geometry changes
    Preupdate,
    /// After the geometry changed
    Update,
    Remove,
}

/// Which usage a context serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Info,
    Drag,
    Sweep,
}

/// Up to three strategies, run in outline, info, cog order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub slots: [Option<Strategy>; 3],
}

impl Context {
    pub fn from_config(slots: &AnnotationSlots, has_shape: bool) -> Result<Self, UnknownStrategy> {
        let pick = |name: &str| -> Result<Option<Strategy>, UnknownStrategy> {
            Ok(Strategy::from_name(name)?.map(|s| s.resolve(has_shape)))
        };
        Ok(Self {
            slots: [pick(&slots.outline)?, pick(&slots.info)?, pick(&slots.cog)?],
        })
    }
}

/// Resources shared by all strategies across one operation
#[derive(Debug, Default)]
pub struct AnnotationState {
    /// Info banner window
    info_window: Option<Window>,
    /// Shaped outline window, shared by shape outline and shape cog
    shape_window: Option<Window>,
    /// Size the outline window was last shaped for
    shape_size: (i32, i32),
    /// Bumped every time the outline is reshaped
    shape_serial: u32,
    /// Outline serial the crosshair was last added at
    cog_serial: u32,
    /// Outstanding server grabs held for xor drawing
    xor_grabs: u32,
}

impl AnnotationState {
    pub fn xor_grabs(&self) -> u32 {
        self.xor_grabs
    }
}

/// Snapshot of the client being annotated
#[derive(Debug, Clone)]
pub struct AnnotationTarget {
    pub screen: usize,
    pub root: Window,
    pub window: Window,
    /// Client area position in logical-screen coordinates
    pub screen_pos: Point,
    pub geometry: Geometry,
    pub cog: Point,
    pub hints: SizeHints,
    /// Governing output, logical-screen coordinates
    pub output: Rect,
    /// Focused border pixel, used to fill overlay windows
    pub fg: u32,
}

impl AnnotationTarget {
    /// `WxH+X+Y` in resize increments and screen coordinates
    fn info_text(&self) -> String {
        let (w, h) = self
            .hints
            .logical_size(self.geometry.width, self.geometry.height);
        format!("{}x{}+{}+{}", w, h, self.screen_pos.x, self.screen_pos.y)
    }

    /// Outer box of the client on the root
    fn outer_rect(&self) -> Rect {
        let b = self.geometry.border_width;
        Rect::new(
            self.screen_pos.x - b,
            self.screen_pos.y - b,
            self.geometry.outer_width(),
            self.geometry.outer_height(),
        )
    }
}

// Inverting strategies. The server stays grabbed while any of them is on
// screen so nothing repaints underneath.

fn xor_init<D: DisplayServer>(state: &mut AnnotationState, display: &mut D) -> Result<()> {
    if state.xor_grabs == 0 {
        display.grab_server()?;
    }
    state.xor_grabs += 1;
    Ok(())
}

fn xor_fini<D: DisplayServer>(state: &mut AnnotationState, display: &mut D) -> Result<()> {
    state.xor_grabs = state.xor_grabs.saturating_sub(1);
    if state.xor_grabs == 0 {
        display.ungrab_server()?;
    }
    Ok(())
}

fn xor_draw_outline<D: DisplayServer>(display: &mut D, t: &AnnotationTarget) -> Result<()> {
    let r = t.outer_rect();
    display.xor_rectangle(t.screen, Rect::new(r.x, r.y, r.width - 1, r.height - 1))
}

fn xor_draw_info<D: DisplayServer>(display: &mut D, t: &AnnotationTarget) -> Result<()> {
    let text = t.info_text();
    let extents = display.text_extents(&text)?;
    let x = t.screen_pos.x + t.geometry.width - extents.width - TEXT_SPACE;
    let y = t.screen_pos.y + t.geometry.height - TEXT_SPACE;
    display.xor_text(t.screen, t.root, x, y, &text)
}

fn xor_draw_cog<D: DisplayServer>(display: &mut D, t: &AnnotationTarget) -> Result<()> {
    let cx = t.screen_pos.x + t.cog.x;
    let cy = t.screen_pos.y + t.cog.y;
    display.xor_line(t.screen, Point::new(cx - 4, cy), Point::new(cx + 5, cy))?;
    display.xor_line(t.screen, Point::new(cx, cy - 4), Point::new(cx, cy + 5))
}

fn xor_outline_create<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    xor_init(s, d)?;
    xor_draw_outline(d, t)
}

fn xor_outline_remove<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    xor_draw_outline(d, t)?;
    xor_fini(s, d)
}

fn xor_info_create<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    xor_init(s, d)?;
    xor_draw_info(d, t)
}

fn xor_info_remove<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    xor_draw_info(d, t)?;
    xor_fini(s, d)
}

fn xor_cog_create<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    xor_init(s, d)?;
    xor_draw_cog(d, t)
}

fn xor_cog_remove<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    xor_draw_cog(d, t)?;
    xor_fini(s, d)
}

// Info banner

fn banner_create<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    if s.info_window.is_none() {
        s.info_window = Some(d.create_overlay(t.root, Rect::new(-4, -4, 2, 2), t.fg)?);
    }
    banner_update(s, d, t)
}

/// Where the banner goes: above the client's top-right corner, kept on
/// the client's output.
fn banner_rect(t: &AnnotationTarget, width: i32, height: i32) -> Rect {
    let g = &t.geometry;
    let local_x = t.screen_pos.x - t.output.x;
    let local_y = t.screen_pos.y - t.output.y;

    let mut x = local_x + g.border_width + g.width - width;
    let mut y = local_y - g.border_width;
    if x + width > t.output.width {
        x = t.output.width - width;
    }
    x = x.max(0);
    if y + height > t.output.height {
        y = t.output.height - height;
    }
    y = y.max(0);
    Rect::new(x + t.output.x, y + t.output.y, width, height)
}

fn banner_update<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    let Some(window) = s.info_window else {
        return Ok(());
    };
    let text = t.info_text();
    let extents = d.text_extents(&text)?;
    let mut width = extents.width + 2;
    let mut height = extents.ascent + extents.descent;

    let name = d.window_name(t.window)?;
    if let Some(name) = &name {
        let name_extents = d.text_extents(name)?;
        if name_extents.width > width {
            width = name_extents.width + 2;
        }
        height += name_extents.ascent + name_extents.descent;
    }

    d.move_resize_window(window, banner_rect(t, width, height))?;
    d.clear_window(window)?;
    if let Some(name) = &name {
        d.xor_text(t.screen, window, 1, height / 2 - 1, name)?;
    }
    d.xor_text(t.screen, window, 1, height - 1, &text)
}

fn banner_remove<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, _t: &AnnotationTarget) -> Result<()> {
    if let Some(window) = s.info_window.take() {
        d.destroy_window(window)?;
    }
    Ok(())
}

// Shaped outline window

/// One pixel frame around a `width` x `height` box.
fn outline_ring(width: i32, height: i32) -> [Rect; 4] {
    [
        Rect::new(0, 0, width, 1),
        Rect::new(0, height - 1, width, 1),
        Rect::new(0, 1, 1, height - 2),
        Rect::new(width - 1, 1, 1, height - 2),
    ]
}

fn shape_outline_reshape<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, window: Window) -> Result<()> {
    let (width, height) = s.shape_size;
    d.set_shape(window, ShapeOp::Set, Point::default(), &outline_ring(width, height))?;
    s.shape_serial = s.shape_serial.wrapping_add(1);
    Ok(())
}

fn shape_outline_create<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    if s.shape_window.is_some() {
        return Ok(());
    }
    let rect = t.outer_rect();
    s.shape_size = (rect.width, rect.height);
    let window = d.create_overlay(t.root, rect, t.fg)?;
    s.shape_window = Some(window);
    shape_outline_reshape(s, d, window)
}

fn shape_outline_update<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    let Some(window) = s.shape_window else {
        return Ok(());
    };
    let rect = t.outer_rect();
    d.move_resize_window(window, rect)?;
    if s.shape_size == (rect.width, rect.height) {
        return Ok(());
    }
    s.shape_size = (rect.width, rect.height);
    shape_outline_reshape(s, d, window)
}

fn shape_outline_remove<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, _t: &AnnotationTarget) -> Result<()> {
    if let Some(window) = s.shape_window.take() {
        d.destroy_window(window)?;
    }
    Ok(())
}

fn shape_cog_add<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    let Some(window) = s.shape_window else {
        return Ok(());
    };
    // The window origin is the outer corner, so step over the border
    let b = t.geometry.border_width;
    let offset = Point::new(t.cog.x + b - 4, t.cog.y + b - 4);
    d.set_shape(
        window,
        ShapeOp::Union,
        offset,
        &[Rect::new(0, 4, 9, 1), Rect::new(4, 0, 1, 9)],
    )?;
    s.cog_serial = s.shape_serial;
    Ok(())
}

fn shape_cog_create<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    shape_outline_create(s, d, t)?;
    shape_cog_add(s, d, t)
}

fn shape_cog_update<D: DisplayServer>(s: &mut AnnotationState, d: &mut D, t: &AnnotationTarget) -> Result<()> {
    shape_outline_update(s, d, t)?;
    if s.cog_serial != s.shape_serial {
        shape_cog_add(s, d, t)?;
    }
    Ok(())
}

/// The three configured contexts and their shared state
#[derive(Debug, Default)]
pub struct Annotator {
    pub state: AnnotationState,
    pub info: Context,
    pub drag: Context,
    pub sweep: Context,
}

impl Annotator {
    pub fn from_config(config: &AnnotationsConfig, has_shape: bool) -> Result<Self, UnknownStrategy> {
        let annotator = Self {
            state: AnnotationState::default(),
            info: Context::from_config(&config.info, has_shape)?,
            drag: Context::from_config(&config.drag, has_shape)?,
            sweep: Context::from_config(&config.sweep, has_shape)?,
        };
        debug!(
            "Annotations: info {:?}, drag {:?}, sweep {:?}",
            annotator.info.slots, annotator.drag.slots, annotator.sweep.slots
        );
        Ok(annotator)
    }

    fn context(&self, kind: ContextKind) -> &Context {
        match kind {
            ContextKind::Info => &self.info,
            ContextKind::Drag => &self.drag,
            ContextKind::Sweep => &self.sweep,
        }
    }

    /// Run `phase` on every slot of the `kind` context.
    pub fn run<D: DisplayServer>(
        &mut self,
        display: &mut D,
        kind: ContextKind,
        phase: Phase,
        target: &AnnotationTarget,
    ) -> Result<()> {
        let slots = self.context(kind).slots;
        for strategy in slots.into_iter().flatten() {
            if let Some(f) = strategy.funcs::<D>().get(phase) {
                f(&mut self.state, display, target)?;
            }
        }
        Ok(())
    }
}

impl<D: DisplayServer> WindowManager<D> {
    fn annotation_target(&self, id: ClientId) -> Option<AnnotationTarget> {
        let client = self.clients.get(id)?;
        let screen = self.screens.get(client.screen)?;
        let output = screen.outputs.get(client.output)?;
        Some(AnnotationTarget {
            screen: screen.number,
            root: screen.root,
            window: client.window,
            screen_pos: client.screen_pos(output),
            geometry: client.current,
            cog: client.cog,
            hints: client.hints,
            output: output.rect(),
            fg: screen.pixels.fg,
        })
    }

    /// Run an annotation phase against the client's current geometry.
    pub fn annotate(&mut self, id: ClientId, kind: ContextKind, phase: Phase) -> Result<()> {
        let Some(target) = self.annotation_target(id) else {
            return Ok(());
        };
        self.annotations.run(&mut self.display, kind, phase, &target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::screen::Desktop;
    use crate::wm::testing::{FakeDisplay, XorDraw};

    fn target() -> AnnotationTarget {
        AnnotationTarget {
            screen: 0,
            root: 1,
            window: 50,
            screen_pos: Point::new(1101, 101),
            geometry: Geometry::new(101, 101, 200, 100, 1),
            cog: Point::new(100, 50),
            hints: SizeHints::default(),
            output: Rect::new(1000, 0, 1000, 768),
            fg: 7,
        }
    }

    fn context(outline: &str, info: &str, cog: &str) -> Context {
        let slots = AnnotationSlots {
            outline: outline.to_string(),
            info: info.to_string(),
            cog: cog.to_string(),
        };
        Context::from_config(&slots, true).unwrap()
    }

    fn annotator(ctx: Context) -> Annotator {
        Annotator {
            drag: ctx,
            ..Annotator::default()
        }
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::from_name("banner"), Ok(Some(Strategy::InfoBanner)));
        assert_eq!(Strategy::from_name("none"), Ok(None));
        for (name, strategy) in [
            ("x11_infobanner", Strategy::InfoBanner),
            ("xor_info", Strategy::XorInfo),
            ("xor_outline", Strategy::XorOutline),
            ("xor_cog", Strategy::XorCog),
            ("shape_outline", Strategy::ShapeOutline),
            ("shape_cog", Strategy::ShapeCog),
        ] {
            assert_eq!(Strategy::from_name(name), Ok(Some(strategy)));
        }
        assert_eq!(
            Strategy::from_name("sparkles"),
            Err(UnknownStrategy("sparkles".to_string()))
        );
    }

    #[test]
    fn test_shape_strategies_fall_back_without_shape() {
        let slots = AnnotationSlots {
            outline: "shape-outline".to_string(),
            info: "xor-info".to_string(),
            cog: "shape-cog".to_string(),
        };
        let ctx = Context::from_config(&slots, false).unwrap();
        assert_eq!(
            ctx.slots,
            [Some(Strategy::XorOutline), Some(Strategy::XorInfo), Some(Strategy::XorCog)]
        );
    }

    #[test]
    fn test_xor_phases_draw_twice_and_balance_server_grab() {
        let mut display = FakeDisplay::new(vec![(1, 2000, 768)]);
        let mut ann = annotator(context("xor-outline", "none", "xor-cog"));
        let t = target();

        ann.run(&mut display, ContextKind::Drag, Phase::Create, &t).unwrap();
        assert_eq!(display.server_grabs, 1);
        assert_eq!(ann.state.xor_grabs(), 2);
        assert_eq!(
            display.xor_log[0],
            XorDraw::Rect(0, Rect::new(1100, 100, 201, 101))
        );
        assert_eq!(
            display.xor_log[1],
            XorDraw::Line(0, Point::new(1197, 151), Point::new(1206, 151))
        );

        ann.run(&mut display, ContextKind::Drag, Phase::Preupdate, &t).unwrap();
        ann.run(&mut display, ContextKind::Drag, Phase::Update, &t).unwrap();
        ann.run(&mut display, ContextKind::Drag, Phase::Remove, &t).unwrap();
        assert_eq!(display.server_grabs, 0);
        assert_eq!(ann.state.xor_grabs(), 0);
        // Rectangle plus two lines per pass, each drawn an even number of times
        assert_eq!(display.xor_log.len(), 4 * 3);
    }

    #[test]
    fn test_xor_info_text_and_position() {
        let mut display = FakeDisplay::new(vec![(1, 2000, 768)]);
        let mut ann = annotator(context("none", "xor-info", "none"));
        ann.run(&mut display, ContextKind::Drag, Phase::Create, &target()).unwrap();

        let text = "200x100+1101+101";
        let width = FakeDisplay::CHAR_WIDTH * text.len() as i32;
        assert_eq!(
            display.xor_log,
            vec![XorDraw::Text(0, 1, 1101 + 200 - width - 3, 101 + 100 - 3, text.to_string())]
        );
    }

    #[test]
    fn test_banner_is_clamped_to_output() {
        let mut display = FakeDisplay::new(vec![(1, 2000, 768)]);
        let mut ann = Annotator {
            info: context("none", "banner", "none"),
            ..Annotator::default()
        };
        let mut t = target();
        // Client hard against the top-right corner of output 1
        t.screen_pos = Point::new(1850, 1);
        t.geometry = Geometry::new(850, 1, 149, 100, 1);

        ann.run(&mut display, ContextKind::Info, Phase::Create, &t).unwrap();
        let banner = display.overlays[0];
        let rect = display.geometry_of(banner).unwrap();
        let text_width = FakeDisplay::CHAR_WIDTH * "149x100+1850+1".len() as i32;
        assert_eq!(rect.width, text_width + 2);
        assert_eq!(rect.x, 2000 - rect.width);
        assert_eq!(rect.y, 0);

        ann.run(&mut display, ContextKind::Info, Phase::Remove, &t).unwrap();
        assert_eq!(display.destroyed, vec![banner]);
    }

    #[test]
    fn test_banner_grows_for_window_name() {
        let mut display = FakeDisplay::new(vec![(1, 2000, 768)]);
        display.names.insert(50, "a rather long window title".to_string());
        let mut ann = Annotator {
            info: context("none", "banner", "none"),
            ..Annotator::default()
        };
        ann.run(&mut display, ContextKind::Info, Phase::Create, &target()).unwrap();
        let rect = display.geometry_of(display.overlays[0]).unwrap();
        assert_eq!(rect.width, FakeDisplay::CHAR_WIDTH * 26 + 2);
        assert_eq!(rect.height, 2 * FakeDisplay::LINE_HEIGHT);
    }

    #[test]
    fn test_shape_outline_reshapes_only_on_resize() {
        let mut display = FakeDisplay::new(vec![(1, 2000, 768)]);
        let mut ann = annotator(context("shape-outline", "none", "shape-cog"));
        let mut t = target();

        ann.run(&mut display, ContextKind::Drag, Phase::Create, &t).unwrap();
        // One window shared by both slots: ring, then crosshair
        assert_eq!(display.overlays.len(), 1);
        let window = display.overlays[0];
        assert_eq!(display.shapes.len(), 2);
        assert_eq!(display.shapes[0].1, ShapeOp::Set);
        assert_eq!(display.shapes[0].3, outline_ring(202, 102).to_vec());
        assert_eq!(display.shapes[1].1, ShapeOp::Union);
        assert_eq!(display.shapes[1].2, Point::new(97, 47));

        // Pure move: no new shape requests
        t.screen_pos = Point::new(1201, 151);
        ann.run(&mut display, ContextKind::Drag, Phase::Update, &t).unwrap();
        assert_eq!(display.shapes.len(), 2);
        assert_eq!(display.geometry_of(window), Some(Rect::new(1200, 150, 202, 102)));

        // Resize: ring and crosshair again
        t.geometry.width = 300;
        t.cog = Point::new(150, 50);
        ann.run(&mut display, ContextKind::Drag, Phase::Update, &t).unwrap();
        assert_eq!(display.shapes.len(), 4);
        assert_eq!(display.shapes[3].2, Point::new(147, 47));

        ann.run(&mut display, ContextKind::Drag, Phase::Remove, &t).unwrap();
        assert_eq!(display.destroyed, vec![window]);
    }

    #[test]
    fn test_wm_annotates_through_configured_context() {
        let mut t = crate::wm::testing::TestWm::new(vec![Rect::new(0, 0, 1000, 768)]);
        let id = t.manage(Rect::new(10, 10, 100, 100));
        t.wm.annotations = annotator(context("xor-outline", "none", "none"));
        t.wm.annotate(id, ContextKind::Drag, Phase::Create).unwrap();
        assert_eq!(t.wm.display.xor_log, vec![XorDraw::Rect(0, Rect::new(10, 10, 101, 101))]);
        assert_eq!(t.wm.clients.get(id).unwrap().vdesk, Desktop::Index(0));
    }
}
