//! Workspace Module
//!
//! Virtual desktops: which desktop each output shows, moving clients
//! between desktops, exchanging the desktops of two outputs and rescaling
//! clients that land on an output of a different size.

use anyhow::Result;
use tracing::{debug, info};

use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::Prop;
use crate::wm::screen::{Desktop, Output};
use crate::wm::WindowManager;

/// Map a position on an axis of size `old_size` onto one of `new_size`,
/// keeping the same proportion of free space on either side.
///
/// Clients too large for either extent keep their position.
pub fn scale_pos(new_size: i32, old_size: i32, pos: i32, size: i32, border: i32) -> i32 {
    let size = size + 2 * border;
    let new_free = new_size - size;
    let old_free = old_size - size;
    if old_free <= 0 || new_free <= 0 {
        return pos;
    }
    new_free * (pos - border) / old_free + border
}

impl<D: DisplayServer> WindowManager<D> {
    /// Show desktop `vdesk` on `output` of `screen`.
    ///
    /// Returns false, changing nothing, when `vdesk` is not a desktop or
    /// some output of the screen already shows it.
    pub fn switch_desktop(&mut self, screen: usize, output: usize, vdesk: Desktop) -> Result<bool> {
        let valid = match vdesk {
            Desktop::Index(n) => n < self.config.vdesks,
            Desktop::None => true,
            Desktop::Fixed => false,
        };
        if !valid {
            return Ok(false);
        }
        let Some(s) = self.screens.get(screen) else {
            return Ok(false);
        };
        if s.output_showing(vdesk).is_some() {
            return Ok(false);
        }
        let Some(target) = s.outputs.get(output).copied() else {
            return Ok(false);
        };
        let docks_visible = s.docks_visible;
        info!(
            "Switching output {} of screen {} from desktop {:?} to {:?}",
            output, screen, target.vdesk, vdesk
        );

        if let Some(current) = self.current {
            if self.clients.get(current).is_some_and(|c| !c.is_fixed()) {
                self.select_client(None)?;
            }
        }

        let (mut hidden, mut shown) = (0, 0);
        let ids: Vec<ClientId> = self.clients.tab_order().to_vec();
        for id in ids {
            let Some(client) = self.clients.get(id) else {
                continue;
            };
            if client.screen != screen {
                continue;
            }
            if client.vdesk == target.vdesk {
                self.client_hide(id)?;
                hidden += 1;
            } else if client.vdesk == vdesk {
                // The desktop may have been shown on another output before
                if client.output != output {
                    let Some(old) = self.client_output(id) else {
                        continue;
                    };
                    if let Some(client) = self.clients.get_mut(id) {
                        client.output = output;
                    }
                    self.fix_screen_client(id, &old)?;
                }
                let is_dock = self.clients.get(id).is_some_and(|c| c.is_dock);
                if !is_dock || docks_visible {
                    self.client_show(id)?;
                }
                shown += 1;
            }
        }

        if let Some(s) = self.screens.get_mut(screen) {
            s.old_vdesk = target.vdesk;
            s.outputs[output].vdesk = vdesk;
        }
        debug!("{} hidden, {} shown", hidden, shown);
        self.update_current_desktop_props(screen)?;
        Ok(true)
    }

    /// Swap the desktops shown by the two outputs of `screen`.
    ///
    /// Only defined for exactly two outputs; anything else is ignored. The
    /// toggle-back desktop is left as it was.
    pub fn exchange_outputs(&mut self, screen: usize) -> Result<()> {
        let Some(s) = self.screens.get_mut(screen) else {
            return Ok(());
        };
        if s.outputs.len() != 2 {
            debug!("Exchange needs two outputs, screen {} has {}", screen, s.outputs.len());
            return Ok(());
        }
        let saved_old = s.old_vdesk;
        let (a, b) = (s.outputs[0].vdesk, s.outputs[1].vdesk);

        // Nothing shows either desktop in between
        s.outputs[0].vdesk = Desktop::None;
        s.outputs[1].vdesk = Desktop::None;
        self.switch_desktop(screen, 0, b)?;
        self.switch_desktop(screen, 1, a)?;

        if let Some(s) = self.screens.get_mut(screen) {
            s.old_vdesk = saved_old;
        }
        Ok(())
    }

    /// Rescale a client that was moved from output `old` to its current
    /// output. Maximised axes fill the new output and only rescale the
    /// saved position.
    pub(crate) fn fix_screen_client(&mut self, id: ClientId, old: &Output) -> Result<()> {
        let Some(new) = self.client_output(id) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let b = client.current.border_width;
        let (g, prev) = (&mut client.current, &mut client.prev);

        if prev.width != 0 {
            g.width = new.width;
            prev.x = scale_pos(new.width, old.width, prev.x, prev.width, b);
        } else {
            g.x = scale_pos(new.width, old.width, g.x, g.width, b);
        }
        if prev.height != 0 {
            g.height = new.height;
            prev.y = scale_pos(new.height, old.height, prev.y, prev.height, b);
        } else {
            g.y = scale_pos(new.height, old.height, g.y, g.height, b);
        }

        client.recompute_cog();
        self.moveresize(id)
    }

    /// Move a client to desktop `vdesk`.
    ///
    /// A client sent to a desktop shown on another output moves over to
    /// that output, so it stays visible only where its desktop is shown.
    pub fn client_to_vdesk(&mut self, id: ClientId, vdesk: Desktop) -> Result<()> {
        if !vdesk.is_valid(self.config.vdesks) {
            return Ok(());
        }
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let old_vdesk = std::mem::replace(&mut client.vdesk, vdesk);
        let (window, screen, output) = (client.window, client.screen, client.output);
        let is_dock = client.is_dock;
        let Some(s) = self.screens.get(screen) else {
            return Ok(());
        };
        let showing = s.output_showing(vdesk);
        let docks_hidden = is_dock && !s.docks_visible;
        // Hiding an unmapped frame would leave a stale ignore_unmap count
        let was_visible = s.desktop_visible(old_vdesk) && !docks_hidden;

        if vdesk.is_fixed() {
            if !docks_hidden {
                self.client_show(id)?;
            }
        } else if let Some(index) = showing {
            if index != output {
                if let Some(old) = self.client_output(id) {
                    if let Some(client) = self.clients.get_mut(id) {
                        client.output = index;
                    }
                    self.fix_screen_client(id, &old)?;
                }
            }
            if !docks_hidden {
                self.client_show(id)?;
            }
        } else if was_visible {
            self.client_hide(id)?;
        }

        self.display
            .set_cardinals(window, Prop::NetWmDesktop, &[vdesk.to_cardinal()])?;
        self.select_client(self.current)
    }

    /// Fix a client to every desktop, or unfix it onto the desktop its
    /// output shows.
    pub fn toggle_fixed(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let target = if client.is_fixed() {
            match self.client_output(id) {
                Some(output) => output.vdesk,
                None => return Ok(()),
            }
        } else {
            Desktop::Fixed
        };
        self.client_to_vdesk(id, target)
    }

    pub fn set_docks_visible(&mut self, screen: usize, visible: bool) -> Result<()> {
        let Some(s) = self.screens.get_mut(screen) else {
            return Ok(());
        };
        if s.docks_visible == visible {
            return Ok(());
        }
        debug!("Screen {}: docks visible {}", screen, visible);
        s.docks_visible = visible;

        let docks: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, c)| c.screen == screen && c.is_dock)
            .map(|(id, _)| id)
            .collect();
        for id in docks {
            if !visible {
                self.client_hide(id)?;
                continue;
            }
            let on_desktop = match (self.clients.get(id), self.client_output(id)) {
                (Some(c), Some(output)) => c.is_fixed() || c.vdesk == output.vdesk,
                _ => false,
            };
            if on_desktop {
                self.client_show(id)?;
                self.client_raise(id)?;
            }
        }
        Ok(())
    }

    pub fn toggle_docks(&mut self, screen: usize) -> Result<()> {
        let Some(visible) = self.screens.get(screen).map(|s| s.docks_visible) else {
            return Ok(());
        };
        self.set_docks_visible(screen, !visible)
    }

    /// Step the desktop on `output` by `delta`, staying within range.
    pub fn switch_relative(&mut self, screen: usize, output: usize, delta: i32) -> Result<()> {
        let Some(Desktop::Index(n)) = self
            .screens
            .get(screen)
            .and_then(|s| s.outputs.get(output))
            .map(|o| o.vdesk)
        else {
            return Ok(());
        };
        let target = n as i64 + delta as i64;
        if target < 0 || target >= self.config.vdesks as i64 {
            return Ok(());
        }
        self.switch_desktop(screen, output, Desktop::Index(target as u32))?;
        Ok(())
    }

    /// Go back to the desktop shown before the last switch.
    pub fn toggle_desktop(&mut self, screen: usize, output: usize) -> Result<()> {
        let Some(old) = self.screens.get(screen).map(|s| s.old_vdesk) else {
            return Ok(());
        };
        self.switch_desktop(screen, output, old)?;
        Ok(())
    }

    /// Mirror the desktops shown on `screen` into root properties.
    pub fn update_current_desktop_props(&mut self, screen: usize) -> Result<()> {
        let Some(s) = self.screens.get(screen) else {
            return Ok(());
        };
        let root = s.root;
        let shown: Vec<u32> = s.outputs.iter().map(|o| o.vdesk.to_cardinal()).collect();
        let first = shown.first().copied().unwrap_or(0);
        let count = self.config.vdesks;
        self.display
            .set_cardinals(root, Prop::NetNumberOfDesktops, &[count])?;
        self.display
            .set_cardinals(root, Prop::NetCurrentDesktop, &[first])?;
        self.display
            .set_cardinals(root, Prop::WispCurrentDesktops, &shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Rect;
    use crate::wm::testing::TestWm;

    fn two_outputs() -> TestWm {
        TestWm::new(vec![Rect::new(0, 0, 800, 600), Rect::new(800, 0, 1600, 600)])
    }

    /// Every client is mapped exactly when its desktop is fixed or shown.
    fn assert_visibility(t: &TestWm) {
        for (_, client) in t.wm.clients.iter() {
            let screen = &t.wm.screens[client.screen];
            let expected = client.is_fixed() || screen.output_showing(client.vdesk).is_some();
            assert_eq!(
                t.wm.display.is_mapped(client.frame),
                expected,
                "client 0x{:x} on {:?}, outputs show {:?}",
                client.window,
                client.vdesk,
                screen.outputs.iter().map(|o| o.vdesk).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_scale_pos() {
        assert_eq!(scale_pos(1600, 800, 301, 198, 1), 701);
        assert_eq!(scale_pos(800, 1600, 701, 198, 1), 301);
        // Wider than the new output: unchanged
        assert_eq!(scale_pos(500, 1600, 40, 600, 1), 40);
    }

    #[test]
    fn test_rescale_round_trip_through_exchange() {
        let mut t = two_outputs();
        let id = t.manage(Rect::new(300, 100, 198, 100));
        assert_eq!(t.wm.clients.get(id).unwrap().current.x, 301);

        t.wm.exchange_outputs(0).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        assert_eq!(client.output, 1);
        assert_eq!((client.current.x, client.current.y), (701, 101));

        t.wm.exchange_outputs(0).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        assert_eq!(client.output, 0);
        assert_eq!((client.current.x, client.current.y), (301, 101));
    }

    #[test]
    fn test_maximised_axis_fills_new_output() {
        let mut t = two_outputs();
        let id = t.manage(Rect::new(300, 100, 198, 100));
        t.wm.maximise(id, crate::wm::client_flags::StateAction::Add, crate::wm::client_flags::MaximiseFlags::HORZ)
            .unwrap();
        t.wm.exchange_outputs(0).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        assert_eq!(client.current.width, 1600);
        assert_eq!(client.prev.x, 701);
    }

    #[test]
    fn test_switch_to_shown_desktop_is_noop() {
        let mut t = two_outputs();
        let id = t.manage(Rect::new(100, 100, 100, 100));
        let before = t.wm.screens[0].clone();
        let requests = t.wm.display.request_count();

        assert!(!t.wm.switch_desktop(0, 0, Desktop::Index(1)).unwrap());
        assert!(!t.wm.switch_desktop(0, 0, Desktop::Index(0)).unwrap());
        assert!(!t.wm.switch_desktop(0, 0, Desktop::Index(99)).unwrap());
        assert_eq!(t.wm.screens[0].outputs, before.outputs);
        assert_eq!(t.wm.screens[0].old_vdesk, before.old_vdesk);
        assert_eq!(t.wm.display.request_count(), requests);
        assert!(t.wm.display.is_mapped(t.wm.clients.get(id).unwrap().frame));
    }

    #[test]
    fn test_switch_hides_and_shows() {
        let mut t = two_outputs();
        let a = t.manage(Rect::new(100, 100, 100, 100));
        assert!(t.wm.switch_desktop(0, 0, Desktop::Index(3)).unwrap());
        let frame = t.wm.clients.get(a).unwrap().frame;
        assert!(!t.wm.display.is_mapped(frame));
        assert_eq!(t.wm.screens[0].old_vdesk, Desktop::Index(0));
        assert_eq!(
            t.wm.display.cardinals(t.root, Prop::WispCurrentDesktops),
            Some(vec![3, 1])
        );
        assert_eq!(t.wm.display.cardinals(t.root, Prop::NetCurrentDesktop), Some(vec![3]));

        t.wm.toggle_desktop(0, 0).unwrap();
        assert!(t.wm.display.is_mapped(frame));
        assert_eq!(t.wm.screens[0].old_vdesk, Desktop::Index(3));
    }

    #[test]
    fn test_visibility_invariant_over_a_sequence() {
        let mut t = two_outputs();
        let ids = [
            t.manage(Rect::new(100, 100, 100, 100)),
            t.manage(Rect::new(900, 100, 100, 100)),
            t.manage(Rect::new(300, 300, 100, 100)),
            t.manage(Rect::new(1200, 300, 100, 100)),
        ];
        t.wm.client_to_vdesk(ids[2], Desktop::Index(2)).unwrap();
        t.wm.client_to_vdesk(ids[3], Desktop::Fixed).unwrap();
        assert_visibility(&t);

        let steps: [(usize, u32); 6] = [(0, 2), (1, 0), (0, 1), (1, 2), (0, 5), (1, 1)];
        for (output, vdesk) in steps {
            t.wm.switch_desktop(0, output, Desktop::Index(vdesk)).unwrap();
            assert_visibility(&t);
            t.wm.exchange_outputs(0).unwrap();
            assert_visibility(&t);
        }
        t.wm.client_to_vdesk(ids[0], Desktop::Index(7)).unwrap();
        assert_visibility(&t);
    }

    #[test]
    fn test_client_to_vdesk_follows_shown_desktop() {
        let mut t = two_outputs();
        let id = t.manage(Rect::new(100, 100, 100, 100));
        t.wm.client_to_vdesk(id, Desktop::Index(1)).unwrap();
        let client = t.wm.clients.get(id).unwrap();
        assert_eq!(client.output, 1);
        assert!(t.wm.display.is_mapped(client.frame));
        assert_eq!(t.wm.display.cardinals(client.window, Prop::NetWmDesktop), Some(vec![1]));

        t.wm.client_to_vdesk(id, Desktop::Index(8)).unwrap();
        assert_eq!(t.wm.clients.get(id).unwrap().vdesk, Desktop::Index(1));
    }

    #[test]
    fn test_exchange_keeps_toggle_desktop() {
        let mut t = two_outputs();
        t.wm.switch_desktop(0, 0, Desktop::Index(4)).unwrap();
        assert_eq!(t.wm.screens[0].old_vdesk, Desktop::Index(0));
        t.wm.exchange_outputs(0).unwrap();
        let shown: Vec<_> = t.wm.screens[0].outputs.iter().map(|o| o.vdesk).collect();
        assert_eq!(shown, vec![Desktop::Index(1), Desktop::Index(4)]);
        assert_eq!(t.wm.screens[0].old_vdesk, Desktop::Index(0));
    }

    #[test]
    fn test_exchange_needs_two_outputs() {
        let mut t = TestWm::new(vec![Rect::new(0, 0, 800, 600)]);
        t.wm.exchange_outputs(0).unwrap();
        assert_eq!(t.wm.screens[0].outputs[0].vdesk, Desktop::Index(0));
    }

    #[test]
    fn test_docks_toggle() {
        let mut t = two_outputs();
        let dock = t.manage_dock(Rect::new(0, 0, 800, 20));
        let frame = t.wm.clients.get(dock).unwrap().frame;
        assert_eq!(t.wm.clients.get(dock).unwrap().vdesk, Desktop::Fixed);
        t.wm.toggle_docks(0).unwrap();
        assert!(!t.wm.display.is_mapped(frame));
        t.wm.toggle_docks(0).unwrap();
        assert!(t.wm.display.is_mapped(frame));
    }

    #[test]
    fn test_switch_relative_is_clamped() {
        let mut t = two_outputs();
        t.wm.switch_relative(0, 0, -1).unwrap();
        assert_eq!(t.wm.screens[0].outputs[0].vdesk, Desktop::Index(0));
        t.wm.switch_relative(0, 1, 1).unwrap();
        assert_eq!(t.wm.screens[0].outputs[1].vdesk, Desktop::Index(2));
        // Desktop 1 is free again but 0 is shown next door
        t.wm.switch_relative(0, 1, -1).unwrap();
        assert_eq!(t.wm.screens[0].outputs[1].vdesk, Desktop::Index(1));
        t.wm.switch_relative(0, 1, -1).unwrap();
        assert_eq!(t.wm.screens[0].outputs[1].vdesk, Desktop::Index(1));
    }
}
