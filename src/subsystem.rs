/// A collection of robot parts and other hardware that act together as a whole.
pub trait Subsystem {
    /// This method will be called once per control cycle
    fn periodic(&mut self) {}
    /// This method will be called once per control cycle, but only during simulation
    fn sim_periodic(&mut self) {}
}
