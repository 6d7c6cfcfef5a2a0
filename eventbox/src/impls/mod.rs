#[cfg(feature = "glam")]
mod glam;
#[cfg(feature = "nalgebra")]
mod nalgebra;

#[allow(unused_macros)]
macro_rules! impl_point {
    ($vector: ty, $dim: literal) => {
        impl $crate::Point<$dim> for $vector {
            #[inline]
            fn to_coordinates(&self) -> [f64; $dim] {
                self.to_array()
            }
        }

        impl $crate::Point<$dim> for &$vector {
            #[inline]
            fn to_coordinates(&self) -> [f64; $dim] {
                self.to_array()
            }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use impl_point;
