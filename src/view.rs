use crate::model::View;
use crate::presenter::Presenter;
use std::sync::Arc;

/// Owns which screen is visible. Exactly one view is active at a time.
pub struct ViewController {
    active: View,
    presenter: Arc<dyn Presenter>,
}

impl ViewController {
    pub fn new(presenter: Arc<dyn Presenter>) -> Self {
        Self {
            active: View::Input,
            presenter,
        }
    }

    pub fn active(&self) -> View {
        self.active
    }

    /// Activate `target` and deactivate the others. Safe to repeat.
    pub fn show_view(&mut self, target: View) {
        self.active = target;
        self.presenter.set_view(target);
    }
}
