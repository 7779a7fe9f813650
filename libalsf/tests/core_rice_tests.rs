mod rice_tests {
    use libalsf_audio::core::rice::*;
    use libalsf_audio::core::{BitReader, BitWriter};
    use libalsf_audio::AlsfError;

    #[test]
    fn test_rice_roundtrip_i32() {
        let residuals: Vec<i32> = vec![100, -200, 50, -10, 0, 150, -300];
        let k = estimate_rice_parameter(&residuals);
        let encoded = encode(&residuals, k);
        let decoded = decode(&encoded, k, residuals.len()).unwrap();

        assert_eq!(residuals, decoded);
        assert_eq!(encoded_len(&residuals, k), encoded.len());
    }

    #[test]
    fn test_rice_wide_values() {
        // 24-bit integers through a 4th order predictor
        let residuals: Vec<i32> = vec![1 << 27, -(1 << 27), 8_388_607, -8_388_608, 0, 1];
        let k = estimate_rice_parameter(&residuals);
        assert!(k <= MAX_RICE_PARAMETER);
        let decoded = decode(&encode(&residuals, k), k, residuals.len()).unwrap();
        assert_eq!(residuals, decoded);
    }

    #[test]
    fn test_rice_extremes() {
        let residuals = vec![i32::MAX, i32::MIN, 0];
        let k = estimate_rice_parameter(&residuals);
        let decoded = decode(&encode(&residuals, k), k, residuals.len()).unwrap();
        assert_eq!(residuals, decoded);
    }

    #[test]
    fn test_rice_short_input() {
        let residuals = vec![5, -5, 5, -5];
        let encoded = encode(&residuals, 2);
        assert!(matches!(
            decode(&encoded[..0], 2, residuals.len()),
            Err(AlsfError::UnexpectedEof)
        ));
        assert!(decode(&encoded, 31, 1).is_err());
    }

    #[test]
    fn test_bit_writer_reader() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b10110, 5);
        writer.write_bits(0b001, 3);
        writer.write_bit(1);
        writer.align_to_byte();
        writer.write_bits(0xDEAD_BEEF, 32);
        assert_eq!(writer.bit_len(), 48);
        let bytes = writer.into_bytes();

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(5).unwrap(), 0b10110);
        assert_eq!(reader.read_bits(3).unwrap(), 0b001);
        assert!(reader.read_flag().unwrap());
        reader.align_to_byte();
        assert_eq!(reader.bit_position(), 16);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEAD_BEEF);
        assert!(matches!(reader.read_bit(), Err(AlsfError::UnexpectedEof)));
    }

    #[test]
    fn test_bit_writer_append() {
        let mut a = BitWriter::new();
        a.write_bits(0b101, 3);
        let mut b = BitWriter::new();
        b.write_bits(0x1FF, 9);
        a.append(&b);
        assert_eq!(a.bit_len(), 12);
        assert_eq!(a.into_bytes(), vec![0b1011_1111, 0b1111_0000]);
    }
}
