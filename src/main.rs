use sable::uci;

fn main() {
    env_logger::init();
    uci::run();
}
