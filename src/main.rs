fn main() {
    openclinic_lib::run()
}
