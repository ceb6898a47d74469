mod test_agent;
mod test_network;
mod test_trainer;
