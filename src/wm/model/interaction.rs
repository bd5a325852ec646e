//! Pointer-driven move and resize.

use tracing::debug;

use super::Model;
use crate::wm::connection::Connection;
use crate::wm::geometry::{Corner, Pos, Window};
use crate::wm::moveresize::Grip;

impl<C: Connection> Model<C> {
    pub(super) fn start_moving(&mut self, window: Window) {
        if self.is_interacting() {
            return;
        }

        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        if !self.is_free(client) {
            return;
        }

        let region = client.free_region();
        let pointer = self.conn.get_pointer_position();

        debug!("WM: Start moving client {:#x}", window);
        self.move_buffer
            .set(window, Grip::Corner(Corner::TopLeft), pointer, region);
        self.conn.confine_pointer(self.move_buffer.handle());
    }

    pub(super) fn start_resizing(&mut self, window: Window, grip: Option<Grip>) {
        if self.is_interacting() {
            return;
        }

        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        if !self.is_free(client) {
            return;
        }

        let region = client.free_region();
        let pointer = self.conn.get_pointer_position();
        let grip = grip.unwrap_or_else(|| Grip::Corner(region.nearest_corner(pointer)));

        debug!("WM: Start resizing client {:#x} from {:?}", window, grip);
        self.resize_buffer.set(window, grip, pointer, region);
        self.conn.confine_pointer(self.resize_buffer.handle());
    }

    pub(super) fn stop_moving(&mut self) {
        if !self.move_buffer.is_occupied() {
            return;
        }

        debug!("WM: Stop moving");
        self.move_buffer.unset();
        self.conn.release_pointer();
    }

    pub(super) fn stop_resizing(&mut self) {
        if !self.resize_buffer.is_occupied() {
            return;
        }

        debug!("WM: Stop resizing");
        self.resize_buffer.unset();
        self.conn.release_pointer();
    }

    pub(super) fn handle_move(&mut self, pos: Pos) {
        let Some(interaction) = self.move_buffer.interaction() else {
            return;
        };

        let still_free = self
            .client_map
            .get(&interaction.window)
            .is_some_and(|client| self.is_free(client));

        if !still_free {
            self.stop_moving();
            return;
        }

        self.reposition_free(interaction.window, interaction.moved_region(pos));
    }

    pub(super) fn handle_resize(&mut self, pos: Pos) {
        let Some(interaction) = self.resize_buffer.interaction() else {
            return;
        };

        let Some(client) = self.client_map.get(&interaction.window) else {
            self.stop_resizing();
            return;
        };

        if !self.is_free(client) {
            self.stop_resizing();
            return;
        }

        let region = interaction.resized_region(
            pos,
            client.free_decoration().extents(),
            client.size_hints().as_ref(),
        );

        self.reposition_free(interaction.window, region);
    }
}
