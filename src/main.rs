fn main() {
    shelfpulse::run()
}
