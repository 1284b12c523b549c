/// One stage of a measurement session.
///
/// Setup and Teardown run exactly once per session; Sampling runs once per
/// requested record. Each phase carries its own operation set.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    Setup,
    Sampling,
    Teardown,
}

impl Phase {
    /// All phases, in session order.
    pub const ALL: [Self; 3] = [Self::Setup, Self::Sampling, Self::Teardown];
}

/// One `T` per [`Phase`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PerPhase<T> {
    pub setup: T,
    pub sampling: T,
    pub teardown: T,
}

impl<T> PerPhase<T> {
    pub const fn new(setup: T, sampling: T, teardown: T) -> Self {
        Self {
            setup,
            sampling,
            teardown,
        }
    }

    /// Builds the triple by calling `f` once per phase, in session order.
    pub fn from_fn(mut f: impl FnMut(Phase) -> T) -> Self {
        Self {
            setup: f(Phase::Setup),
            sampling: f(Phase::Sampling),
            teardown: f(Phase::Teardown),
        }
    }

    pub const fn get(&self, phase: Phase) -> &T {
        match phase {
            Phase::Setup => &self.setup,
            Phase::Sampling => &self.sampling,
            Phase::Teardown => &self.teardown,
        }
    }

    pub const fn get_mut(&mut self, phase: Phase) -> &mut T {
        match phase {
            Phase::Setup => &mut self.setup,
            Phase::Sampling => &mut self.sampling,
            Phase::Teardown => &mut self.teardown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_visits_in_session_order() {
        let mut seen = Vec::new();
        let triple = PerPhase::from_fn(|phase| {
            seen.push(phase);
            seen.len()
        });
        assert_eq!(seen, Phase::ALL.to_vec());
        assert_eq!(triple.setup, 1);
        assert_eq!(triple.sampling, 2);
        assert_eq!(triple.teardown, 3);
    }

    #[test]
    fn get_mut_reaches_each_slot() {
        let mut triple = PerPhase::new(0u32, 0, 0);
        for (phase, v) in Phase::ALL.into_iter().zip([10u32, 11, 12]) {
            *triple.get_mut(phase) = v;
        }
        assert_eq!((triple.setup, triple.sampling, triple.teardown), (10, 11, 12));
    }
}
