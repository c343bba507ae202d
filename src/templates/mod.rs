pub mod panel_template;
