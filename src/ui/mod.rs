/// UI layer: egui panels and chart rendering.
pub mod charts;
pub mod panels;
pub mod treemap;
