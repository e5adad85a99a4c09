//! EWMH (Extended Window Manager Hints) implementation
//!
//! Atom interning and the property vocabulary the window manager reads and
//! writes. Core code names properties through [`Prop`]; only the X11
//! display knows the interned atom values.

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::wrapper::ConnectionExt as _;

const PROP_COUNT: usize = 26;

/// Properties (and property values) the window manager deals in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prop {
    WmState,
    WmProtocols,
    WmDeleteWindow,
    NetSupported,
    NetSupportingWmCheck,
    NetNumberOfDesktops,
    NetCurrentDesktop,
    NetActiveWindow,
    NetClientList,
    NetClientListStacking,
    NetWmName,
    NetWmDesktop,
    NetWmWindowType,
    NetWmWindowTypeDock,
    NetWmState,
    NetWmStateMaximizedVert,
    NetWmStateMaximizedHorz,
    NetWmStateFullscreen,
    NetCloseWindow,
    NetMoveresizeWindow,
    NetRestackWindow,
    NetRequestFrameExtents,
    NetFrameExtents,
    /// One desktop number per output
    WispCurrentDesktops,
    /// Saved `[x, width]` while horizontally maximised
    WispUnmaximisedHorz,
    /// Saved `[y, height]` while vertically maximised
    WispUnmaximisedVert,
}

impl Prop {
    pub const ALL: [Prop; PROP_COUNT] = [
        Prop::WmState,
        Prop::WmProtocols,
        Prop::WmDeleteWindow,
        Prop::NetSupported,
        Prop::NetSupportingWmCheck,
        Prop::NetNumberOfDesktops,
        Prop::NetCurrentDesktop,
        Prop::NetActiveWindow,
        Prop::NetClientList,
        Prop::NetClientListStacking,
        Prop::NetWmName,
        Prop::NetWmDesktop,
        Prop::NetWmWindowType,
        Prop::NetWmWindowTypeDock,
        Prop::NetWmState,
        Prop::NetWmStateMaximizedVert,
        Prop::NetWmStateMaximizedHorz,
        Prop::NetWmStateFullscreen,
        Prop::NetCloseWindow,
        Prop::NetMoveresizeWindow,
        Prop::NetRestackWindow,
        Prop::NetRequestFrameExtents,
        Prop::NetFrameExtents,
        Prop::WispCurrentDesktops,
        Prop::WispUnmaximisedHorz,
        Prop::WispUnmaximisedVert,
    ];

    /// Atom name on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Prop::WmState => "WM_STATE",
            Prop::WmProtocols => "WM_PROTOCOLS",
            Prop::WmDeleteWindow => "WM_DELETE_WINDOW",
            Prop::NetSupported => "_NET_SUPPORTED",
            Prop::NetSupportingWmCheck => "_NET_SUPPORTING_WM_CHECK",
            Prop::NetNumberOfDesktops => "_NET_NUMBER_OF_DESKTOPS",
            Prop::NetCurrentDesktop => "_NET_CURRENT_DESKTOP",
            Prop::NetActiveWindow => "_NET_ACTIVE_WINDOW",
            Prop::NetClientList => "_NET_CLIENT_LIST",
            Prop::NetClientListStacking => "_NET_CLIENT_LIST_STACKING",
            Prop::NetWmName => "_NET_WM_NAME",
            Prop::NetWmDesktop => "_NET_WM_DESKTOP",
            Prop::NetWmWindowType => "_NET_WM_WINDOW_TYPE",
            Prop::NetWmWindowTypeDock => "_NET_WM_WINDOW_TYPE_DOCK",
            Prop::NetWmState => "_NET_WM_STATE",
            Prop::NetWmStateMaximizedVert => "_NET_WM_STATE_MAXIMIZED_VERT",
            Prop::NetWmStateMaximizedHorz => "_NET_WM_STATE_MAXIMIZED_HORZ",
            Prop::NetWmStateFullscreen => "_NET_WM_STATE_FULLSCREEN",
            Prop::NetCloseWindow => "_NET_CLOSE_WINDOW",
            Prop::NetMoveresizeWindow => "_NET_MOVERESIZE_WINDOW",
            Prop::NetRestackWindow => "_NET_RESTACK_WINDOW",
            Prop::NetRequestFrameExtents => "_NET_REQUEST_FRAME_EXTENTS",
            Prop::NetFrameExtents => "_NET_FRAME_EXTENTS",
            Prop::WispCurrentDesktops => "_WISP_CURRENT_DESKTOPS",
            Prop::WispUnmaximisedHorz => "_WISP_UNMAXIMISED_HORZ",
            Prop::WispUnmaximisedVert => "_WISP_UNMAXIMISED_VERT",
        }
    }

    /// Properties advertised in `_NET_SUPPORTED`.
    pub fn supported() -> &'static [Prop] {
        &[
            Prop::NetSupported,
            Prop::NetSupportingWmCheck,
            Prop::NetNumberOfDesktops,
            Prop::NetCurrentDesktop,
            Prop::NetActiveWindow,
            Prop::NetClientList,
            Prop::NetClientListStacking,
            Prop::NetWmName,
            Prop::NetWmDesktop,
            Prop::NetWmWindowType,
            Prop::NetWmWindowTypeDock,
            Prop::NetWmState,
            Prop::NetWmStateMaximizedVert,
            Prop::NetWmStateMaximizedHorz,
            Prop::NetWmStateFullscreen,
            Prop::NetCloseWindow,
            Prop::NetMoveresizeWindow,
            Prop::NetRestackWindow,
            Prop::NetRequestFrameExtents,
            Prop::NetFrameExtents,
        ]
    }
}

/// Interned atoms, indexed like [`Prop::ALL`]
#[derive(Debug, Clone)]
pub struct Atoms {
    atoms: [Atom; PROP_COUNT],
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        // Send every request before waiting on the first reply
        let cookies = Prop::ALL
            .iter()
            .map(|p| conn.intern_atom(false, p.name().as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let utf8_cookie = conn.intern_atom(false, b"UTF8_STRING")?;

        let mut atoms = [0; PROP_COUNT];
        for (slot, (cookie, prop)) in atoms.iter_mut().zip(cookies.into_iter().zip(Prop::ALL)) {
            *slot = cookie
                .reply()
                .with_context(|| format!("Failed to intern {}", prop.name()))?
                .atom;
        }

        Ok(Self {
            atoms,
            utf8_string: utf8_cookie.reply()?.atom,
        })
    }

    pub fn atom(&self, prop: Prop) -> Atom {
        let index = Prop::ALL.iter().position(|&p| p == prop).unwrap_or(0);
        self.atoms[index]
    }

    /// Reverse lookup, used for client messages and property notifications.
    pub fn prop(&self, atom: Atom) -> Option<Prop> {
        if atom == x11rb::NONE {
            return None;
        }
        self.atoms.iter().position(|&a| a == atom).map(|i| Prop::ALL[i])
    }

    /// Set up _NET_SUPPORTED and the supporting-WM check window on a root
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window, check: Window) -> Result<()> {
        let supported: Vec<Atom> = Prop::supported().iter().map(|&p| self.atom(p)).collect();
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.atom(Prop::NetSupported),
            AtomEnum::ATOM,
            &supported,
        )?;
        for window in [root, check] {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                self.atom(Prop::NetSupportingWmCheck),
                AtomEnum::WINDOW,
                &[check],
            )?;
        }
        conn.change_property8(
            PropMode::REPLACE,
            check,
            self.atom(Prop::NetWmName),
            self.utf8_string,
            b"wisp",
        )?;
        Ok(())
    }

    /// Get _NET_WM_WINDOW_TYPE property for a window
    pub fn get_window_type<C: Connection>(&self, conn: &C, window: Window) -> Result<Vec<Atom>> {
        let reply = conn
            .get_property(
                false,
                window,
                self.atom(Prop::NetWmWindowType),
                AtomEnum::ATOM,
                0,
                1024,
            )?
            .reply()?;
        Ok(reply.value32().map(|v| v.collect()).unwrap_or_default())
    }

    /// Whether a window lists WM_DELETE_WINDOW in its WM_PROTOCOLS.
    pub fn supports_delete<C: Connection>(&self, conn: &C, window: Window) -> Result<bool> {
        let reply = conn
            .get_property(false, window, self.atom(Prop::WmProtocols), AtomEnum::ATOM, 0, 1024)?
            .reply()?;
        let delete = self.atom(Prop::WmDeleteWindow);
        Ok(reply
            .value32()
            .map(|mut atoms| atoms.any(|atom| atom == delete))
            .unwrap_or(false))
    }

    /// Ask a client to close through WM_DELETE_WINDOW.
    pub fn send_delete<C: Connection>(&self, conn: &C, window: Window) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atom(Prop::WmProtocols),
            [self.atom(Prop::WmDeleteWindow), x11rb::CURRENT_TIME, 0, 0, 0],
        );
        conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    /// Read the first CARDINAL of a property, if set.
    pub fn get_cardinal<C: Connection>(&self, conn: &C, window: Window, prop: Prop) -> Result<Option<u32>> {
        let reply = conn
            .get_property(false, window, self.atom(prop), AtomEnum::CARDINAL, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut v| v.next()))
    }
}
