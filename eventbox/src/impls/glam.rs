use super::impl_point;
use glam::{DVec2, DVec3, DVec4};

impl_point!(DVec2, 2);
impl_point!(DVec3, 3);
impl_point!(DVec4, 4);
