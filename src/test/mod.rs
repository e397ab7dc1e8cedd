mod ifq;
mod network;
mod red;
mod simulator;
