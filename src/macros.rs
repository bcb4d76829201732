/// Generates `set_*` methods that route a single field through `Fringes::update`.
///
/// Usage:
/// `setters!(set_y => y: usize, set_v => v: impl Into<PeriodsInput>);`
macro_rules! setters {
    ($($name:ident => $field:ident : $ty:ty),* $(,)?) => {
        $(
            #[allow(clippy::useless_conversion)]
            pub fn $name(&mut self, value: $ty) -> &mut Self {
                self.update(&$crate::params::Update { $field: Some(value.into()), ..Default::default() });
                self
            }
        )*
    };
}
