mod bonding_curve;
mod constant_product;

pub use bonding_curve::BondingCurveBuilder;
pub use constant_product::ConstantProductAmmBuilder;
