//! 블록 정의 및 와이어 코덱
//!
//! - Block: UDP 데이터그램 하나에 담기는 단위 (헤더 + 페이로드)
//! - Primary Block: 인덱스 0, 페이로드에 전송 메타데이터를 담음
//! - BlockSet: 파일을 블록 크기로 분할한 결과 (송신측)
//!
//! 와이어 레이아웃 (빅엔디언):
//! `[index:4][checksum:4 (선택)][payload]`

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::{WireConfig, CHECKSUM_LEN, INDEX_LEN, TOTAL_BLOCKS_LEN};
use crate::{Error, Result, PRIMARY_INDEX};

/// 블록 인덱스 (0 = 프라이머리, 1.. = 데이터)
pub type BlockIndex = u32;

/// 블록 (송수신 데이터그램 단위)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// 블록 인덱스
    pub index: BlockIndex,

    /// CRC32 체크섬 (체크섬 비활성 시 None)
    pub checksum: Option<u32>,

    /// 페이로드
    pub payload: Bytes,
}

impl Block {
    /// 새 블록 생성, 체크섬 활성 시 페이로드 CRC32 계산
    pub fn new(index: BlockIndex, payload: Bytes, checksum_enabled: bool) -> Self {
        let checksum = checksum_enabled.then(|| crc32fast::hash(&payload));
        Self {
            index,
            checksum,
            payload,
        }
    }

    /// 프라이머리 블록 여부
    pub fn is_primary(&self) -> bool {
        self.index == PRIMARY_INDEX
    }
}

/// 프라이머리 블록이 전달하는 전송 메타데이터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryInfo {
    /// 총 블록 수 (데이터 블록 + 1)
    pub total_blocks: u32,

    /// 전체 파일 CRC32
    pub file_checksum: u32,
}

impl PrimaryInfo {
    /// 데이터 블록 수
    pub fn data_blocks(&self) -> u32 {
        self.total_blocks.saturating_sub(1)
    }

    /// 페이로드 직렬화: `[total:4][file_checksum:4|8]`
    ///
    /// 8바이트 폭에서는 CRC32 값을 u64로 0 확장한다.
    pub fn to_payload(&self, wire: &WireConfig) -> Bytes {
        let mut buf = BytesMut::with_capacity(wire.primary_payload_len());
        buf.put_u32(self.total_blocks);
        if wire.file_checksum_len() == 8 {
            buf.put_u64(u64::from(self.file_checksum));
        } else {
            buf.put_u32(self.file_checksum);
        }
        buf.freeze()
    }

    /// 페이로드에서 역직렬화
    pub fn from_payload(payload: &[u8], wire: &WireConfig) -> Result<Self> {
        let expected = wire.primary_payload_len();
        if payload.len() < expected {
            return Err(Error::MalformedPrimary {
                len: payload.len(),
                expected,
            });
        }

        let total_blocks = read_u32(&payload[..TOTAL_BLOCKS_LEN]);
        if total_blocks == 0 {
            // 프라이머리 자신도 세므로 최소 1
            return Err(Error::MalformedPrimary {
                len: payload.len(),
                expected,
            });
        }

        let rest = &payload[TOTAL_BLOCKS_LEN..expected];
        let file_checksum = if rest.len() == 8 {
            let mut wide = [0u8; 8];
            wide.copy_from_slice(rest);
            u64::from_be_bytes(wide) as u32
        } else {
            read_u32(rest)
        };

        Ok(Self {
            total_blocks,
            file_checksum,
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// 블록 코덱 (한 전송 동안 헤더 길이 고정)
#[derive(Debug, Clone, Copy)]
pub struct BlockCodec {
    wire: WireConfig,
}

impl BlockCodec {
    pub fn new(wire: WireConfig) -> Self {
        Self { wire }
    }

    pub fn wire(&self) -> &WireConfig {
        &self.wire
    }

    pub fn header_len(&self) -> usize {
        self.wire.header_len()
    }

    /// 블록을 바이트로 직렬화 (헤더 + 페이로드, 패딩 없음)
    pub fn encode(&self, block: &Block) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.header_len() + block.payload.len());
        buf.put_u32(block.index);
        if self.wire.checksum_enabled {
            let checksum = block
                .checksum
                .unwrap_or_else(|| crc32fast::hash(&block.payload));
            buf.put_u32(checksum);
        }
        buf.extend_from_slice(&block.payload);
        buf.freeze()
    }

    /// 데이터그램에서 블록 역직렬화 및 체크섬 검증
    pub fn decode(&self, datagram: &[u8]) -> Result<Block> {
        let header_len = self.header_len();
        if datagram.len() < header_len {
            return Err(Error::MalformedHeader {
                len: datagram.len(),
                header_len,
            });
        }

        let index = read_u32(&datagram[..INDEX_LEN]);
        let payload = &datagram[header_len..];

        let checksum = if self.wire.checksum_enabled {
            let expected = read_u32(&datagram[INDEX_LEN..INDEX_LEN + CHECKSUM_LEN]);
            let actual = crc32fast::hash(payload);
            if expected != actual {
                return Err(Error::ChecksumMismatch {
                    index,
                    expected,
                    actual,
                });
            }
            Some(expected)
        } else {
            None
        };

        Ok(Block {
            index,
            checksum,
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// 프라이머리 블록 생성
    pub fn primary_block(&self, info: &PrimaryInfo) -> Block {
        Block::new(
            PRIMARY_INDEX,
            info.to_payload(&self.wire),
            self.wire.checksum_enabled,
        )
    }

    /// 프라이머리 블록 페이로드 해석
    pub fn decode_primary(&self, block: &Block) -> Result<PrimaryInfo> {
        PrimaryInfo::from_payload(&block.payload, &self.wire)
    }
}

/// 블록 집합 (송신측 파일 분할 결과)
///
/// 인덱스 오름차순으로 이어 붙이면 원본 파일과 같다.
/// 마지막 블록만 블록 크기보다 짧을 수 있다.
#[derive(Debug, Clone)]
pub struct BlockSet {
    primary: Block,
    blocks: Vec<Block>,
    info: PrimaryInfo,
    file_len: usize,
}

impl BlockSet {
    /// 파일 데이터를 블록들로 분할
    pub fn partition(data: Bytes, wire: &WireConfig) -> Result<Self> {
        wire.validate()?;

        let block_count = (data.len() + wire.block_size - 1) / wire.block_size;
        let total_blocks = block_count as u64 + 1;
        if total_blocks > u64::from(u32::MAX) {
            return Err(Error::FileTooLarge {
                blocks: total_blocks,
            });
        }

        let info = PrimaryInfo {
            total_blocks: total_blocks as u32,
            file_checksum: crc32fast::hash(&data),
        };

        let blocks = (0..block_count)
            .map(|i| {
                let start = i * wire.block_size;
                let end = (start + wire.block_size).min(data.len());
                Block::new(
                    i as BlockIndex + 1,
                    data.slice(start..end),
                    wire.checksum_enabled,
                )
            })
            .collect();

        Ok(Self {
            primary: BlockCodec::new(*wire).primary_block(&info),
            blocks,
            info,
            file_len: data.len(),
        })
    }

    pub fn primary(&self) -> &Block {
        &self.primary
    }

    /// 데이터 블록 (인덱스 1..N 오름차순)
    pub fn data_blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn info(&self) -> PrimaryInfo {
        self.info
    }

    pub fn total_blocks(&self) -> u32 {
        self.info.total_blocks
    }

    pub fn file_len(&self) -> usize {
        self.file_len
    }

    /// 한 라운드 전송 순서: 프라이머리 후 데이터 블록
    pub fn round(&self) -> impl Iterator<Item = &Block> {
        std::iter::once(&self.primary).chain(self.blocks.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    fn concat(set: &BlockSet) -> Vec<u8> {
        set.data_blocks()
            .iter()
            .flat_map(|b| b.payload.iter().copied())
            .collect()
    }

    #[test]
    fn test_partition_reconstructs_file() {
        let mut rng = rand::thread_rng();
        for &block_size in &[12usize, 100, 508, 1024] {
            for &len in &[0usize, 1, block_size - 1, block_size, block_size + 1, 5000] {
                let mut data = vec![0u8; len];
                rng.fill_bytes(&mut data);
                let wire = WireConfig::new(block_size, rng.gen());
                let set = BlockSet::partition(Bytes::from(data.clone()), &wire).unwrap();

                assert_eq!(concat(&set), data);
                assert_eq!(set.file_len(), len);
                assert_eq!(set.data_blocks().len() as u32, set.total_blocks() - 1);
                for (i, block) in set.data_blocks().iter().enumerate() {
                    assert_eq!(block.index, i as u32 + 1);
                    if i + 1 < set.data_blocks().len() {
                        assert_eq!(block.payload.len(), block_size);
                    } else {
                        assert!(block.payload.len() <= block_size);
                    }
                }
            }
        }
    }

    #[test]
    fn test_thousand_bytes_into_508() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let set = BlockSet::partition(Bytes::from(data.clone()), &WireConfig::default()).unwrap();

        assert_eq!(set.total_blocks(), 3);
        assert_eq!(set.data_blocks()[0].payload.len(), 508);
        assert_eq!(set.data_blocks()[1].payload.len(), 492);
        assert_eq!(set.info().file_checksum, crc32fast::hash(&data));

        let order: Vec<u32> = set.round().map(|b| b.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_file_has_only_primary() {
        let set = BlockSet::partition(Bytes::new(), &WireConfig::default()).unwrap();
        assert_eq!(set.total_blocks(), 1);
        assert!(set.data_blocks().is_empty());
        assert_eq!(set.round().count(), 1);
    }

    #[test]
    fn test_encode_layout() {
        let codec = BlockCodec::new(WireConfig::new(508, true));
        let block = Block::new(0x01020304, Bytes::from_static(b"abc"), true);
        let bytes = codec.encode(&block);

        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
        assert_eq!(&bytes[4..8], &crc32fast::hash(b"abc").to_be_bytes());
        assert_eq!(&bytes[8..], b"abc");
        assert_eq!(codec.encode(&block), bytes);

        let codec = BlockCodec::new(WireConfig::new(508, false));
        let bytes = codec.encode(&Block::new(7, Bytes::from_static(b"xyz"), false));
        assert_eq!(bytes.as_ref(), &[0, 0, 0, 7, b'x', b'y', b'z']);
    }

    #[test]
    fn test_codec_roundtrip() {
        for checksum_enabled in [true, false] {
            let codec = BlockCodec::new(WireConfig::new(508, checksum_enabled));
            let block = Block::new(42, Bytes::from(vec![9u8; 300]), checksum_enabled);
            let decoded = codec.decode(&codec.encode(&block)).unwrap();
            assert_eq!(decoded, block);
        }
    }

    #[test]
    fn test_short_datagram_is_malformed() {
        let codec = BlockCodec::new(WireConfig::new(508, true));
        for len in 0..8 {
            let result = codec.decode(&vec![0u8; len]);
            assert!(matches!(result, Err(Error::MalformedHeader { header_len: 8, .. })));
        }

        let codec = BlockCodec::new(WireConfig::new(508, false));
        assert!(matches!(
            codec.decode(&[0, 0, 1]),
            Err(Error::MalformedHeader { len: 3, header_len: 4 })
        ));
        // 헤더만 있는 데이터그램은 빈 페이로드 블록
        assert!(codec.decode(&[0, 0, 0, 1]).unwrap().payload.is_empty());
    }

    #[test]
    fn test_altered_payload_fails_checksum() {
        let codec = BlockCodec::new(WireConfig::new(508, true));
        let block = Block::new(5, Bytes::from_static(b"hello world"), true);
        let mut bytes = codec.encode(&block).to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        match codec.decode(&bytes) {
            Err(Error::ChecksumMismatch { index, .. }) => assert_eq!(index, 5),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_primary_payload_widths() {
        let info = PrimaryInfo {
            total_blocks: 5,
            file_checksum: 0xDEADBEEF,
        };

        let wide = WireConfig::new(508, true);
        let payload = info.to_payload(&wide);
        assert_eq!(payload.len(), 12);
        assert_eq!(&payload[4..8], &[0, 0, 0, 0]);
        assert_eq!(PrimaryInfo::from_payload(&payload, &wide).unwrap(), info);

        let narrow = WireConfig::new(508, false);
        let payload = info.to_payload(&narrow);
        assert_eq!(payload.len(), 8);
        assert_eq!(PrimaryInfo::from_payload(&payload, &narrow).unwrap(), info);

        assert!(matches!(
            PrimaryInfo::from_payload(&payload[..6], &narrow),
            Err(Error::MalformedPrimary { len: 6, expected: 8 })
        ));
        assert!(PrimaryInfo::from_payload(&[0u8; 8], &narrow).is_err());
    }

    #[test]
    fn test_primary_block_through_codec() {
        let codec = BlockCodec::new(WireConfig::default());
        let info = PrimaryInfo {
            total_blocks: 3,
            file_checksum: 77,
        };
        let decoded = codec.decode(&codec.encode(&codec.primary_block(&info))).unwrap();
        assert!(decoded.is_primary());
        assert_eq!(codec.decode_primary(&decoded).unwrap(), info);
    }
}
