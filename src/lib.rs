pub mod photokit_core;
