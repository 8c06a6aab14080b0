// Route modules for the add-on service
pub mod addon; // Workspace add-on triggers and button actions
pub mod oauth; // GitHub OAuth redirect target
