//! Maximise Module
//!
//! Per-axis maximise and fullscreen. A non-zero saved size in `prev` is the
//! only record that an axis is maximised.

use anyhow::Result;
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::client::ClientId;
use crate::wm::client_flags::{MaximiseFlags, StateAction};
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::Prop;
use crate::wm::WindowManager;

/// What a maximise request did to one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisChange {
    /// Maximised; carries the saved position and size
    Saved(i32, i32),
    Restored,
    Unchanged,
}

/// Apply `action` to one axis. `pos`/`size` are the live values and
/// `prev_pos`/`prev_size` the saved ones.
fn maximise_axis(
    pos: &mut i32,
    size: &mut i32,
    prev_pos: &mut i32,
    prev_size: &mut i32,
    border: i32,
    extent: i32,
    action: StateAction,
) -> AxisChange {
    if *prev_size != 0 {
        if action == StateAction::Add {
            return AxisChange::Unchanged;
        }
        *pos = *prev_pos;
        *size = *prev_size;
        *prev_size = 0;
        AxisChange::Restored
    } else {
        if action == StateAction::Remove {
            return AxisChange::Unchanged;
        }
        *prev_pos = *pos;
        *prev_size = *size;
        *pos = border;
        *size = extent - 2 * border;
        AxisChange::Saved(*prev_pos, *prev_size)
    }
}

impl<D: DisplayServer> WindowManager<D> {
    /// Maximise, restore or toggle the axes named by `flags`.
    ///
    /// Fullscreen implies both axes and also takes the border away. Whether
    /// a client is fullscreen is tracked on its own, so maximising both axes
    /// with a zero configured border is still just maximised.
    pub fn maximise(&mut self, id: ClientId, action: StateAction, flags: MaximiseFlags) -> Result<()> {
        let Some(output) = self.client_output(id) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };

        let mut flags = flags;
        let mut action = action;
        let mut fullscreen = None;
        if flags.contains(MaximiseFlags::FULLSCREEN) {
            let enter = match action {
                StateAction::Add => true,
                StateAction::Remove => false,
                StateAction::Toggle => !client.fullscreen,
            };
            // Already in the requested state: the axes are left alone
            if enter != client.fullscreen {
                fullscreen = Some(enter);
                flags |= MaximiseFlags::HORZ | MaximiseFlags::VERT;
                action = if enter { StateAction::Add } else { StateAction::Remove };
            }
        }
        debug!("Maximise {:?} {:?}", action, flags);

        if fullscreen == Some(false) {
            // Border goes back first so the axes restore around it
            client.fullscreen = false;
            client.current.border_width = client.old_border;
        }
        let (window, frame) = (client.window, client.frame);
        let b = client.current.border_width;

        let horz = if flags.contains(MaximiseFlags::HORZ) {
            maximise_axis(
                &mut client.current.x,
                &mut client.current.width,
                &mut client.prev.x,
                &mut client.prev.width,
                b,
                output.width,
                action,
            )
        } else {
            AxisChange::Unchanged
        };
        let vert = if flags.contains(MaximiseFlags::VERT) {
            maximise_axis(
                &mut client.current.y,
                &mut client.current.height,
                &mut client.prev.y,
                &mut client.prev.height,
                b,
                output.height,
                action,
            )
        } else {
            AxisChange::Unchanged
        };

        for (change, prop) in [(horz, Prop::WispUnmaximisedHorz), (vert, Prop::WispUnmaximisedVert)] {
            match change {
                AxisChange::Saved(pos, size) => {
                    self.display
                        .set_cardinals(window, prop, &[pos as u32, size as u32])?;
                }
                AxisChange::Restored => self.display.delete_property(window, prop)?,
                AxisChange::Unchanged => {}
            }
        }

        match fullscreen {
            Some(true) => {
                let Some(client) = self.clients.get_mut(id) else {
                    return Ok(());
                };
                client.fullscreen = true;
                client.old_border = client.current.border_width;
                client.current = Geometry::new(0, 0, output.width, output.height, 0);
                self.display.set_border_width(frame, 0)?;
                self.set_frame_extents(id)?;
            }
            Some(false) => {
                let border = self.clients.get(id).map_or(0, |c| c.current.border_width);
                self.display.set_border_width(frame, border)?;
                self.set_frame_extents(id)?;
            }
            None => {}
        }

        if let Some(client) = self.clients.get_mut(id) {
            client.recompute_cog();
        }
        self.set_net_wm_state(id)?;
        self.moveresize_raise(id)?;
        self.display.discard_enter_events()
    }

    /// Mirror the maximise state into `_NET_WM_STATE`.
    pub fn set_net_wm_state(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let mut state = Vec::with_capacity(3);
        if client.is_maximised_horz() {
            state.push(Prop::NetWmStateMaximizedHorz);
        }
        if client.is_maximised_vert() {
            state.push(Prop::NetWmStateMaximizedVert);
        }
        if client.is_fullscreen() {
            state.push(Prop::NetWmStateFullscreen);
        }
        let window = client.window;
        self.display.set_atom_list(window, Prop::NetWmState, &state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::shared::Rect;
    use crate::wm::testing::TestWm;

    fn setup() -> (TestWm, ClientId) {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 1000, 768)]);
        let id = t.manage(Rect::new(100, 100, 200, 100));
        (t, id)
    }

    fn geometry(t: &TestWm, id: ClientId) -> Geometry {
        t.wm.clients.get(id).unwrap().current
    }

    #[test]
    fn test_horizontal_round_trip() {
        let (mut t, id) = setup();
        let before = geometry(&t, id);
        let window = t.wm.clients.get(id).unwrap().window;

        t.wm.maximise(id, StateAction::Add, MaximiseFlags::HORZ).unwrap();
        let g = geometry(&t, id);
        assert_eq!((g.x, g.width), (1, 998));
        assert_eq!((g.y, g.height), (before.y, before.height));
        assert_eq!(
            t.wm.display.cardinals(window, Prop::WispUnmaximisedHorz),
            Some(vec![101, 200])
        );
        assert_eq!(
            t.wm.display.atom_list(window, Prop::NetWmState),
            Some(vec![Prop::NetWmStateMaximizedHorz])
        );

        // Adding again changes nothing
        t.wm.maximise(id, StateAction::Add, MaximiseFlags::HORZ).unwrap();
        assert_eq!(geometry(&t, id), g);

        t.wm.maximise(id, StateAction::Remove, MaximiseFlags::HORZ).unwrap();
        assert_eq!(geometry(&t, id), before);
        assert!(!t.wm.clients.get(id).unwrap().is_maximised_horz());
        assert_eq!(t.wm.display.cardinals(window, Prop::WispUnmaximisedHorz), None);
        assert_eq!(t.wm.display.atom_list(window, Prop::NetWmState), Some(vec![]));
    }

    #[test]
    fn test_axes_are_independent() {
        let (mut t, id) = setup();
        let before = geometry(&t, id);
        t.wm.maximise(id, StateAction::Toggle, MaximiseFlags::VERT).unwrap();
        t.wm.maximise(id, StateAction::Toggle, MaximiseFlags::HORZ).unwrap();
        let g = geometry(&t, id);
        assert_eq!((g.x, g.y, g.width, g.height), (1, 1, 998, 766));

        t.wm.maximise(id, StateAction::Remove, MaximiseFlags::VERT).unwrap();
        let g = geometry(&t, id);
        assert_eq!((g.y, g.height), (before.y, before.height));
        assert_eq!((g.x, g.width), (1, 998));

        t.wm.maximise(id, StateAction::Toggle, MaximiseFlags::HORZ).unwrap();
        assert_eq!(geometry(&t, id), before);
    }

    #[test]
    fn test_fullscreen_round_trip_restores_border() {
        let (mut t, id) = setup();
        let before = geometry(&t, id);
        let (window, frame) = {
            let c = t.wm.clients.get(id).unwrap();
            (c.window, c.frame)
        };
        let discards = t.wm.display.enter_discards;

        t.wm.maximise(id, StateAction::Toggle, MaximiseFlags::FULLSCREEN).unwrap();
        assert_eq!(geometry(&t, id), Geometry::new(0, 0, 1000, 768, 0));
        assert_eq!(t.wm.display.border_of(frame), Some(0));
        assert!(t.wm.clients.get(id).unwrap().is_fullscreen());
        assert_eq!(
            t.wm.display.atom_list(window, Prop::NetWmState),
            Some(vec![
                Prop::NetWmStateMaximizedHorz,
                Prop::NetWmStateMaximizedVert,
                Prop::NetWmStateFullscreen
            ])
        );
        assert_eq!(t.wm.display.geometry_of(frame), Some(Rect::new(0, 0, 1000, 768)));
        assert!(t.wm.display.enter_discards > discards);

        t.wm.maximise(id, StateAction::Toggle, MaximiseFlags::FULLSCREEN).unwrap();
        assert_eq!(geometry(&t, id), before);
        assert_eq!(t.wm.display.border_of(frame), Some(1));
    }

    #[test]
    fn test_fullscreen_add_then_remove() {
        let (mut t, id) = setup();
        let before = geometry(&t, id);
        t.wm.maximise(id, StateAction::Add, MaximiseFlags::FULLSCREEN).unwrap();
        t.wm.maximise(id, StateAction::Remove, MaximiseFlags::FULLSCREEN).unwrap();
        assert_eq!(geometry(&t, id), before);
        assert!(!t.wm.clients.get(id).unwrap().is_maximised_vert());
    }

    #[test]
    fn test_removing_fullscreen_keeps_plain_maximise() {
        let (mut t, id) = setup();
        t.wm.maximise(id, StateAction::Add, MaximiseFlags::HORZ | MaximiseFlags::VERT).unwrap();
        let maximised = geometry(&t, id);
        t.wm.maximise(id, StateAction::Remove, MaximiseFlags::FULLSCREEN).unwrap();
        assert_eq!(geometry(&t, id), maximised);
        assert!(t.wm.clients.get(id).unwrap().is_maximised_horz());
    }

    #[test]
    fn test_maximise_axis_helper() {
        let (mut pos, mut size, mut ppos, mut psize) = (40, 300, 0, 0);
        let change = maximise_axis(&mut pos, &mut size, &mut ppos, &mut psize, 2, 800, StateAction::Toggle);
        assert_eq!(change, AxisChange::Saved(40, 300));
        assert_eq!((pos, size), (2, 796));
        let change = maximise_axis(&mut pos, &mut size, &mut ppos, &mut psize, 2, 800, StateAction::Remove);
        assert_eq!(change, AxisChange::Restored);
        assert_eq!((pos, size, psize), (40, 300, 0));
        let change = maximise_axis(&mut pos, &mut size, &mut ppos, &mut psize, 2, 800, StateAction::Remove);
        assert_eq!(change, AxisChange::Unchanged);
    }

    #[test]
    fn test_zero_border_maximise_is_not_fullscreen() {
        let config = Config {
            border_width: 0,
            ..Config::default()
        };
        let mut t = TestWm::with_config(vec![Rect::new(0, 0, 1000, 768)], config);
        let id = t.manage(Rect::new(100, 100, 200, 100));
        let window = t.wm.clients.get(id).unwrap().window;

        t.wm.maximise(id, StateAction::Add, MaximiseFlags::HORZ | MaximiseFlags::VERT).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        assert!(client.is_maximised_horz() && client.is_maximised_vert());
        assert!(!client.is_fullscreen());
        assert_eq!(
            t.wm.display.atom_list(window, Prop::NetWmState),
            Some(vec![Prop::NetWmStateMaximizedHorz, Prop::NetWmStateMaximizedVert])
        );

        // Fullscreen on top of a full maximise is still a change of state
        t.wm.maximise(id, StateAction::Toggle, MaximiseFlags::FULLSCREEN).unwrap();
        assert!(t.wm.clients.get(id).unwrap().is_fullscreen());
        t.wm.maximise(id, StateAction::Toggle, MaximiseFlags::FULLSCREEN).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        assert!(!client.is_fullscreen());
        assert!(!client.is_maximised_horz());
    }
}
